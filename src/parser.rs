use regex::Regex;
use std::sync::LazyLock;

static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d{4})\)").expect("year pattern is valid"));

const ILLEGAL_CHARS: [char; 10] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|', '\0'];

/// A file from the source directory with its title and year pulled out of the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub filename: String,
    pub title: String,
    pub year: Option<String>,
}

impl SourceFile {
    pub fn parse(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            title: parse_title(filename),
            year: parse_year(filename),
        }
    }

    /// Everything after the last `.`, if there is one.
    pub fn extension(&self) -> Option<&str> {
        self.filename.rsplit_once('.').map(|(_, ext)| ext)
    }

    /// Season and special posters only ever belong to a series.
    pub fn is_season_asset(&self) -> bool {
        self.filename.contains("Season") || self.filename.contains("Special")
    }

    /// The filename without its extension. Names whose only dot is the leading one
    /// are returned whole.
    pub fn stem(&self) -> &str {
        match self.filename.rsplit_once('.') {
            Some((stem, _)) if !stem.trim_start_matches('.').is_empty() => stem,
            _ => &self.filename,
        }
    }
}

/// Text before the first `(`, right-trimmed. The whole name when there is no `(`.
pub fn parse_title(name: &str) -> String {
    name.split('(')
        .next()
        .unwrap_or_default()
        .trim_end()
        .to_string()
}

/// The digits of the first parenthesized 4-digit run.
pub fn parse_year(name: &str) -> Option<String> {
    YEAR_PATTERN
        .captures(name)
        .and_then(|captures| captures.get(1))
        .map(|year| year.as_str().to_string())
}

pub fn remove_illegal_chars(name: &str) -> String {
    name.replace(ILLEGAL_CHARS, "")
}

/// Catalog title as used for scoring: a parenthesized year and anything after it
/// is dropped, then characters that can't appear in a filename are removed.
pub fn comparable_title(title: &str) -> String {
    if YEAR_PATTERN.is_match(title) {
        remove_illegal_chars(&parse_title(title))
    } else {
        remove_illegal_chars(title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_title_and_year() {
        let file = SourceFile::parse("Inception (2010).jpg");
        assert_eq!(file.title, "Inception");
        assert_eq!(file.year.as_deref(), Some("2010"));
    }

    #[test]
    fn test_parse_season_poster() {
        let file = SourceFile::parse("Breaking Bad (2008) Season 3.jpg");
        assert_eq!(file.title, "Breaking Bad");
        assert_eq!(file.year.as_deref(), Some("2008"));
    }

    #[test]
    fn test_parse_without_parenthesis() {
        let file = SourceFile::parse("Harry Potter Collection.jpg");
        assert_eq!(file.title, "Harry Potter Collection.jpg");
        assert_eq!(file.year, None);
    }

    #[test]
    fn test_parse_parenthesis_without_year() {
        let file = SourceFile::parse("The Office (US).png");
        assert_eq!(file.title, "The Office");
        assert_eq!(file.year, None);
    }

    #[test]
    fn test_parse_year_after_other_parenthesis() {
        let file = SourceFile::parse("The Office (US) (2005).png");
        assert_eq!(file.title, "The Office");
        assert_eq!(file.year.as_deref(), Some("2005"));
    }

    #[test]
    fn test_parse_year_uses_first_match() {
        assert_eq!(
            parse_year("Dune (1984) remake (2021).jpg").as_deref(),
            Some("1984")
        );
    }

    #[test]
    fn test_parse_year_ignores_unparenthesized_digits() {
        assert_eq!(parse_year("Blade Runner 2049.jpg"), None);
        assert_eq!(parse_year("Movie (19999).jpg"), None);
    }

    #[test]
    fn test_parse_title_trims_trailing_whitespace() {
        assert_eq!(parse_title("Alien   (1979).jpg"), "Alien");
    }

    #[test]
    fn test_extension() {
        assert_eq!(SourceFile::parse("Alien (1979).jpg").extension(), Some("jpg"));
        assert_eq!(SourceFile::parse("Mr. Robot (2015).png").extension(), Some("png"));
        assert_eq!(SourceFile::parse("poster").extension(), None);
    }

    #[test]
    fn test_is_season_asset() {
        assert!(SourceFile::parse("Show (2019) Season 01.jpg").is_season_asset());
        assert!(SourceFile::parse("Show (2019)_Season01.jpg").is_season_asset());
        assert!(SourceFile::parse("Show (2019) Specials.jpg").is_season_asset());
        assert!(!SourceFile::parse("Show (2019).jpg").is_season_asset());
    }

    #[test]
    fn test_stem() {
        assert_eq!(
            SourceFile::parse("Harry Potter Collection.jpg").stem(),
            "Harry Potter Collection"
        );
        assert_eq!(SourceFile::parse("Mr. Robot.png").stem(), "Mr. Robot");
        assert_eq!(SourceFile::parse(".hidden").stem(), ".hidden");
        assert_eq!(SourceFile::parse("noextension").stem(), "noextension");
    }

    #[test]
    fn test_remove_illegal_chars() {
        assert_eq!(
            remove_illegal_chars("Star Wars: Episode IV"),
            "Star Wars Episode IV"
        );
        assert_eq!(remove_illegal_chars(r#"a\b/c:d*e?f"g<h>i|j"#), "abcdefghij");
        assert_eq!(remove_illegal_chars("nul\0byte"), "nulbyte");
    }

    #[test]
    fn test_comparable_title_strips_year() {
        assert_eq!(comparable_title("Show (2019)"), "Show");
        assert_eq!(comparable_title("What If...? (2021)"), "What If...");
    }

    #[test]
    fn test_comparable_title_keeps_other_parenthesis() {
        assert_eq!(comparable_title("The Office (US)"), "The Office (US)");
        assert_eq!(comparable_title("Mission: Impossible"), "Mission Impossible");
    }
}
