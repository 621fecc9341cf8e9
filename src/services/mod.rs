pub mod personalization;
pub mod popularity;
pub mod predictor;

pub use personalization::{Personalizer, DEFAULT_RECOMMENDATIONS};
pub use popularity::{top_rated, HOME_LIST_SIZE};
pub use predictor::{Predictor, SvdModel};
