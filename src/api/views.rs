use axum::response::Html;

use crate::models::{BookCard, RecommendedBook, ScoredBook, TitleRatings};

/// Genres linked from the page header
const NAV_GENRES: &[&str] = &[
    "Fantasy",
    "Science Fiction",
    "Mystery",
    "Romance",
    "Historical Fiction",
    "Nonfiction",
];

const STYLE: &str = "
        body { font-family: sans-serif; margin: 0; background: #faf7f2; color: #222; }
        header { background: #3b2f2f; color: #fff; padding: 1rem 2rem; }
        header a { color: #f4d9a6; margin-right: 1rem; text-decoration: none; }
        main { padding: 1rem 2rem; }
        .books { display: flex; flex-wrap: wrap; gap: 1rem; }
        .book { background: #fff; border: 1px solid #ddd; border-radius: 6px; padding: 0.75rem; width: 12rem; }
        .book img { display: block; margin-bottom: 0.5rem; }
        .notice { background: #e3f4e1; border: 1px solid #9bc997; padding: 0.5rem 1rem; }
        .error { background: #fbe3e3; border: 1px solid #d99; padding: 0.5rem 1rem; }
        .meta { color: #666; font-size: 0.85rem; }";

/// Everything the home page shows
pub struct HomePage<'a> {
    pub notice: Option<String>,
    pub error: Option<String>,
    pub popular: &'a [ScoredBook],
    pub picks: &'a [RecommendedBook],
    pub session_ratings: &'a TitleRatings,
}

/// Escapes text for use in HTML bodies and quoted attributes
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> Html<String> {
    let nav: String = NAV_GENRES
        .iter()
        .map(|g| format!("<a href=\"/genres/{}\">{}</a>", urlencoding::encode(g), escape(g)))
        .collect();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <style>{style}
    </style>
</head>
<body>
    <header>
        <a href="/"><strong>Book Recommender</strong></a>
        {nav}
    </header>
    <main>
{body}
    </main>
</body>
</html>"#,
        title = escape(title),
        style = STYLE,
        nav = nav,
        body = body,
    ))
}

fn card(out: &mut String, card: &BookCard, extra: &str) {
    let year = card.year.map(|y| y.to_string()).unwrap_or_default();
    out.push_str(&format!(
        r#"
        <div class="book">
            <img src="{img}" alt="{title}">
            <strong>{title}</strong>
            <div class="meta">{authors} {year}</div>
            <div class="meta">{genres}</div>
            <div class="meta">Average rating {avg:.2}{extra}</div>
        </div>"#,
        img = escape(&card.small_image_url),
        title = escape(&card.title),
        authors = escape(&card.authors),
        year = year,
        genres = escape(&card.genres),
        avg = card.average_rating,
        extra = extra,
    ));
}

fn pick(out: &mut String, book: &RecommendedBook) {
    let year = book.year.map(|y| y.to_string()).unwrap_or_default();
    out.push_str(&format!(
        r#"
        <div class="book">
            <img src="{img}" alt="{title}">
            <strong>{title}</strong>
            <div class="meta">{authors} {year}</div>
            <div class="meta">{genres}</div>
            <div class="meta">You might rate it {est:.1}</div>
        </div>"#,
        img = escape(&book.small_image_url),
        title = escape(&book.title),
        authors = escape(&book.authors),
        year = year,
        genres = escape(&book.genres),
        est = book.estimate,
    ));
}

/// Renders the rating form with popular books and personal picks
pub fn render_home(view: &HomePage<'_>) -> Html<String> {
    let mut body = String::new();

    if let Some(notice) = &view.notice {
        body.push_str(&format!("<p class=\"notice\">{}</p>", escape(notice)));
    }
    if let Some(error) = &view.error {
        body.push_str(&format!("<p class=\"error\">{}</p>", escape(error)));
    }

    body.push_str(
        r#"
        <form method="post" action="/">
            <label>Book title <input type="text" name="movie_input"></label>
            <label>Rating (1-5) <input type="text" name="rating_input"></label>
            <button type="submit">Rate</button>
        </form>"#,
    );

    if !view.session_ratings.is_empty() {
        body.push_str("\n        <h2>Your ratings</h2>\n        <ul class=\"ratings\">");
        for (title, rating) in view.session_ratings {
            body.push_str(&format!("\n            <li>{} ({})</li>", escape(title), rating));
        }
        body.push_str("\n        </ul>");
    }

    if !view.picks.is_empty() {
        body.push_str("\n        <h2>Picked for you</h2>\n        <div class=\"books picks\">");
        for book in view.picks {
            pick(&mut body, book);
        }
        body.push_str("\n        </div>");
    }

    body.push_str("\n        <h2>Popular books</h2>\n        <div class=\"books popular\">");
    for scored in view.popular {
        card(&mut body, &scored.book, &format!(", score {:.2}", scored.score));
    }
    body.push_str("\n        </div>");

    page("Book Recommender", &body)
}

/// Renders the books matching one genre
pub fn render_genre(genre: &str, books: &[BookCard]) -> Html<String> {
    let mut body = format!("        <h1>{}</h1>", escape(genre));

    if books.is_empty() {
        body.push_str("\n        <p>No books found for this genre.</p>");
    } else {
        body.push_str("\n        <div class=\"books\">");
        for book in books {
            card(&mut body, book, "");
        }
        body.push_str("\n        </div>");
    }

    page(&format!("{} books", genre), &body)
}
