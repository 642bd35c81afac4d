use serde::Deserialize;

use super::{check_status, ApiError};

const JIKAN: &str = "https://api.jikan.moe/v4";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Anime,
    Manga,
}

impl MediaKind {
    fn path(self) -> &'static str {
        match self {
            MediaKind::Anime => "anime",
            MediaKind::Manga => "manga",
        }
    }
}

#[derive(Debug, Deserialize)]
struct Search {
    data: Vec<MediaEntry>,
}

/// An anime or manga as returned by Jikan's search endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaEntry {
    pub mal_id: u64,
    pub url: String,
    pub title: String,
    pub title_english: Option<String>,
    pub synopsis: Option<String>,
    pub score: Option<f32>,
    pub rank: Option<u32>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub episodes: Option<u32>,
    pub chapters: Option<u32>,
    pub volumes: Option<u32>,
    #[serde(default)]
    pub genres: Vec<Named>,
    pub images: Option<Images>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Named {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Images {
    pub jpg: ImageUrls,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageUrls {
    pub image_url: Option<String>,
    pub large_image_url: Option<String>,
}

impl MediaEntry {
    #[must_use]
    pub fn cover(&self) -> Option<&str> {
        let jpg = &self.images.as_ref()?.jpg;
        jpg.large_image_url
            .as_deref()
            .or(jpg.image_url.as_deref())
    }

    #[must_use]
    pub fn genre_list(&self) -> String {
        if self.genres.is_empty() {
            return "Unknown".to_owned();
        }
        self.genres
            .iter()
            .map(|g| g.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Episodes for anime, chapters/volumes for manga.
    #[must_use]
    pub fn length(&self, kind: MediaKind) -> String {
        fn or_unknown(value: Option<u32>) -> String {
            value.map_or_else(|| "?".to_owned(), |v| v.to_string())
        }

        match kind {
            MediaKind::Anime => format!("{} episodes", or_unknown(self.episodes)),
            MediaKind::Manga => format!(
                "{} chapters, {} volumes",
                or_unknown(self.chapters),
                or_unknown(self.volumes)
            ),
        }
    }
}

/// Best match for `query`, excluding adult entries.
pub async fn search(
    client: &reqwest::Client,
    kind: MediaKind,
    query: &str,
) -> Result<MediaEntry, ApiError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ApiError::Invalid("Give me something to search for.".to_owned()));
    }

    let response = client
        .get(format!("{JIKAN}/{}", kind.path()))
        .query(&[("q", query), ("limit", "1"), ("sfw", "true")])
        .send()
        .await?;

    let search: Search = check_status(response)?.json().await?;
    search.data.into_iter().next().ok_or(ApiError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "data": [{
            "mal_id": 5114,
            "url": "https://myanimelist.net/anime/5114",
            "title": "Fullmetal Alchemist: Brotherhood",
            "title_english": null,
            "synopsis": "After a horrific alchemy experiment...",
            "score": 9.1,
            "rank": 1,
            "status": "Finished Airing",
            "type": "TV",
            "episodes": 64,
            "genres": [{"mal_id": 1, "name": "Action"}, {"mal_id": 2, "name": "Adventure"}],
            "images": {"jpg": {"image_url": "small.jpg", "large_image_url": "large.jpg"}}
        }]
    }"#;

    #[test]
    fn decodes_search_result() {
        let search: Search = serde_json::from_str(SAMPLE).unwrap();
        let entry = &search.data[0];

        assert_eq!(entry.mal_id, 5114);
        assert_eq!(entry.kind.as_deref(), Some("TV"));
        assert_eq!(entry.cover(), Some("large.jpg"));
        assert_eq!(entry.genre_list(), "Action, Adventure");
        assert_eq!(entry.length(MediaKind::Anime), "64 episodes");
        assert_eq!(entry.length(MediaKind::Manga), "? chapters, ? volumes");
    }

    #[test]
    fn empty_result_set() {
        let search: Search = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(search.data.is_empty());
    }
}
