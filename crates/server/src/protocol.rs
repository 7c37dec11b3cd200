//! Wire protocol: the exact lines exchanged with clients.
//!
//! Every message is a single `\n`-terminated line. The text is fixed and
//! clients match on it, so these strings must not change.

use crate::store::RecommendationRecord;

pub const WELCOME: &str = "Bienvenido al sistema de recomendación de películas!";
pub const USER_ID_PROMPT: &str = "Por favor, ingresa tu ID de usuario:";
pub const CATALOG_READY: &str = "Los archivos CSV se leyeron correctamente. Puedes empezar a elegir un género para obtener recomendaciones.";
pub const GENRE_PROMPT: &str = "Por favor, selecciona uno de los siguientes géneros:";
pub const END_OF_GENRES: &str = "[END_OF_GENRES]";
pub const INVALID_GENRE_INDEX: &str = "Índice de género no válido.";
pub const NO_RECOMMENDATIONS: &str =
    "No se encontraron recomendaciones para el género seleccionado.";
pub const RECOMMENDATIONS_HEADER: &str = "Películas recomendadas combinadas para el género:";

/// `"<i>. <genre>"` with a 1-based index
pub fn format_genre_line(index: usize, genre: &str) -> String {
    format!("{}. {}", index, genre)
}

/// `"Películas recomendadas combinadas para el género: <genre>"`
pub fn format_recommendations_header(genre: &str) -> String {
    format!("{} {}", RECOMMENDATIONS_HEADER, genre)
}

/// One recommendation line with a 1-based index and a two-decimal average
pub fn format_recommendation_line(index: usize, record: &RecommendationRecord) -> String {
    format!(
        "{}. Título: {}, Géneros: {}, Calificación Promedio Combinada: {:.2}",
        index,
        record.title,
        record.genres.join(", "),
        record.combined_avg
    )
}

/// A recommendation line as read back by a client
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationLine {
    pub index: usize,
    pub title: String,
    pub genres: Vec<String>,
    pub combined_avg: f64,
}

/// Split `"<i>. <rest>"` into its index and the rest
fn split_index(line: &str) -> Option<(usize, &str)> {
    let (index, rest) = line.split_once(". ")?;
    Some((index.parse().ok()?, rest))
}

/// Parse a menu line back into `(index, genre)`
pub fn parse_genre_line(line: &str) -> Option<(usize, String)> {
    let (index, genre) = split_index(line)?;
    Some((index, genre.to_string()))
}

/// Parse a line produced by [`format_recommendation_line`]
///
/// Titles may contain commas, so the fixed labels are located from the end.
pub fn parse_recommendation_line(line: &str) -> Option<RecommendationLine> {
    let (index, rest) = split_index(line)?;
    let rest = rest.strip_prefix("Título: ")?;
    let (rest, avg) = rest.rsplit_once(", Calificación Promedio Combinada: ")?;
    let (title, genres) = rest.rsplit_once(", Géneros: ")?;

    Some(RecommendationLine {
        index,
        title: title.to_string(),
        genres: genres.split(", ").map(str::to_string).collect(),
        combined_avg: avg.trim().parse().ok()?,
    })
}

/// Parse an integer sent by the client.
///
/// Only the first whitespace-separated token counts. Anything that isn't an
/// integer (including an empty line or end of stream) reads as 0.
pub fn parse_integer(line: &str) -> i64 {
    line.split_whitespace()
        .next()
        .and_then(|token| token.parse().ok())
        .unwrap_or(0)
}
