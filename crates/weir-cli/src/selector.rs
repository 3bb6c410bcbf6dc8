use regex::Regex;

/// Matches filter display names against user-supplied patterns.
///
/// Patterns are lowercased at construction and applied as substring
/// regexes over lowercased names, so matching is case-insensitive. An
/// empty selector selects everything; the front end treats the literal
/// pattern `all` as "no filtering" before a selector is ever built.
pub struct Selector {
    matchers: Vec<Regex>,
}

impl Selector {
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let matchers = patterns
            .into_iter()
            .map(|pattern| Regex::new(&pattern.as_ref().to_lowercase()))
            .collect::<Result<_, _>>()?;
        Ok(Self { matchers })
    }

    pub fn empty() -> Self {
        Self {
            matchers: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// True when any of the given names matches any pattern. With no
    /// patterns, everything is selected.
    pub fn selects<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> bool {
        if self.matchers.is_empty() {
            return true;
        }
        names.into_iter().any(|name| {
            let name = name.to_lowercase();
            self.matchers.iter().any(|matcher| matcher.is_match(&name))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_selector_selects_everything() {
        let selector = Selector::empty();
        assert!(selector.selects(["anything at all"]));
        assert!(selector.selects([]));
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let selector = Selector::new(["FireWall"]).unwrap();
        assert!(selector.selects(["corporate firewall rules"]));
        assert!(!selector.selects(["packet scheduler"]));
    }

    #[test]
    fn any_name_matching_any_pattern_selects() {
        let selector = Selector::new(["weir", "vpn"]).unwrap();
        assert!(selector.selects(["base sublayer", "acme vpn provider"]));
        assert!(!selector.selects(["base sublayer", "other provider"]));
    }

    #[test]
    fn patterns_are_real_regexes() {
        let selector = Selector::new(["^weir$"]).unwrap();
        assert!(selector.selects(["WEIR"]));
        assert!(!selector.selects(["weir filters"]));
    }

    #[test]
    fn invalid_patterns_are_reported() {
        assert!(Selector::new(["("]).is_err());
    }
}
