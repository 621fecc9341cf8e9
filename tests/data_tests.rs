use book_recommender::db::{Catalog, GENRE_PAGE_SIZE};
use book_recommender::models::TitleRatings;
use book_recommender::services::{top_rated, Personalizer, Predictor, SvdModel, HOME_LIST_SIZE};

fn load() -> (Catalog, SvdModel) {
    let catalog = Catalog::load("data/books.csv", "data/ratings.csv").unwrap();
    let model = SvdModel::load("data/model.json").unwrap();
    (catalog, model)
}

#[test]
fn test_bundled_data_loads() {
    let (catalog, _) = load();
    assert_eq!(catalog.books().len(), 12);
    assert_eq!(catalog.max_user_id(), Some(5));
}

#[test]
fn test_bundled_popular_list_skips_barely_rated_books() {
    let (catalog, _) = load();
    let popular = top_rated(catalog.books(), HOME_LIST_SIZE);
    assert_eq!(popular.len(), HOME_LIST_SIZE);
    assert!(popular.iter().all(|b| b.book.title != "A Little Known Chapbook"));
}

#[test]
fn test_bundled_genre_lookup() {
    let (catalog, _) = load();
    let titles: Vec<String> = catalog
        .books_by_genre("FANTASY", GENRE_PAGE_SIZE)
        .into_iter()
        .map(|b| b.title)
        .collect();
    assert_eq!(
        titles,
        vec!["The Hobbit", "The Name of the Wind", "The Way of Kings", "Mistborn"]
    );
}

#[test]
fn test_bundled_model_personalizes_for_new_reader() {
    let (catalog, model) = load();
    let personalizer = Personalizer::new(&catalog, &model);

    let ratings = TitleRatings::from([("The Hobbit".to_string(), 5), ("Mistborn".to_string(), 5)]);
    let picks = personalizer.recommend(&ratings, 3).unwrap();

    assert_eq!(picks.len(), 3);
    assert!(picks.iter().all(|b| b.title != "The Hobbit" && b.title != "Mistborn"));
    for pair in picks.windows(2) {
        assert!(pair[0].estimate >= pair[1].estimate);
    }
    assert!(picks.iter().all(|b| (1.0..=5.0).contains(&b.estimate)));
    assert_eq!(model.name(), "svd");
}

#[test]
fn test_bundled_model_separates_fans_from_critics() {
    let (catalog, model) = load();
    let personalizer = Personalizer::new(&catalog, &model);
    let rate_both = |rating| {
        TitleRatings::from([
            ("The Hobbit".to_string(), rating),
            ("Mistborn".to_string(), rating),
        ])
    };

    let fans = personalizer.recommend(&rate_both(5), 5).unwrap();
    let critics = personalizer.recommend(&rate_both(1), 5).unwrap();

    let fan_ids: Vec<u32> = fans.iter().map(|b| b.book_id).collect();
    let critic_ids: Vec<u32> = critics.iter().map(|b| b.book_id).collect();
    assert_ne!(fan_ids, critic_ids);
    // other fantasy tops the fans' list
    assert_eq!(&fan_ids[..2], &[4, 7]);

    let fan_low = fans.iter().map(|b| b.estimate).fold(f64::INFINITY, f64::min);
    let critic_high = critics.iter().map(|b| b.estimate).fold(f64::NEG_INFINITY, f64::max);
    assert!(fan_low > critic_high, "{} <= {}", fan_low, critic_high);
}
