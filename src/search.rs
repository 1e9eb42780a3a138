// src/search.rs - Pattern search over buffer lines (`/`, `?`, `n`, `N`)

use crate::buffer::Buffer;
use crate::error::EditorError;
use crate::motion::Position;
use log::{debug, warn};
use lru::LruCache;
use regex::{Regex, RegexBuilder};
use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::ops::Range as ByteRange;
use unicode_segmentation::UnicodeSegmentation;

const PATTERN_CACHE_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchDirection {
    #[default]
    Forward,
    Backward,
}

impl SearchDirection {
    pub fn reversed(self) -> Self {
        match self {
            SearchDirection::Forward => SearchDirection::Backward,
            SearchDirection::Backward => SearchDirection::Forward,
        }
    }
}

/// Caller-supplied matcher used by search and `:s`.
///
/// Returns the byte ranges of every non-overlapping match in `haystack`.
pub trait PatternMatcher {
    fn find_all(
        &self,
        pattern: &str,
        haystack: &str,
        ignore_case: bool,
    ) -> Result<Vec<ByteRange<usize>>, EditorError>;
}

/// Keep the ranges a matcher returned that are in order, non-overlapping and
/// on char boundaries of `haystack`; anything else is dropped.
pub fn usable_ranges(haystack: &str, ranges: Vec<ByteRange<usize>>) -> Vec<ByteRange<usize>> {
    let mut last_end = 0;
    ranges
        .into_iter()
        .filter(|r| {
            let usable = r.start >= last_end
                && r.start <= r.end
                && haystack.is_char_boundary(r.start)
                && haystack.is_char_boundary(r.end);
            if usable {
                last_end = r.end;
            } else {
                warn!("matcher returned unusable range {:?}", r);
            }
            usable
        })
        .collect()
}

/// Regex matcher; a pattern that fails to compile is matched literally.
pub struct RegexMatcher {
    cache: RefCell<LruCache<(String, bool), Regex>>,
}

impl RegexMatcher {
    pub fn new() -> Self {
        let capacity = NonZeroUsize::new(PATTERN_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RefCell::new(LruCache::new(capacity)),
        }
    }

    fn compile(pattern: &str, ignore_case: bool) -> Result<Regex, EditorError> {
        let build = |p: &str| RegexBuilder::new(p).case_insensitive(ignore_case).build();
        match build(pattern) {
            Ok(regex) => Ok(regex),
            Err(_) => {
                debug!("pattern {:?} is not a valid regex, matching literally", pattern);
                build(&regex::escape(pattern))
                    .map_err(|e| EditorError::InvalidPattern(e.to_string()))
            }
        }
    }
}

impl Default for RegexMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternMatcher for RegexMatcher {
    fn find_all(
        &self,
        pattern: &str,
        haystack: &str,
        ignore_case: bool,
    ) -> Result<Vec<ByteRange<usize>>, EditorError> {
        let key = (pattern.to_string(), ignore_case);
        let mut cache = self.cache.borrow_mut();
        if !cache.contains(&key) {
            let regex = Self::compile(pattern, ignore_case)?;
            cache.put(key.clone(), regex);
        }
        let Some(regex) = cache.get(&key) else {
            return Ok(Vec::new());
        };
        Ok(regex.find_iter(haystack).map(|m| m.range()).collect())
    }
}

/// A match on one line in grapheme columns, `[start_col, end_col)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    pub line: usize,
    pub start_col: usize,
    pub end_col: usize,
}

impl SearchMatch {
    pub fn start(&self) -> Position {
        Position::new(self.line, self.start_col)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub wrap_scan: bool,
    pub ignore_case: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            wrap_scan: true,
            ignore_case: false,
        }
    }
}

/// Last search, reused by `n`, `N` and an empty pattern.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub last_pattern: Option<String>,
    pub last_direction: SearchDirection,
    pub highlight: bool,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a search. An empty pattern reuses the previous one.
    pub fn begin(
        &mut self,
        pattern: &str,
        direction: SearchDirection,
    ) -> Result<String, EditorError> {
        let pattern = if pattern.is_empty() {
            self.last_pattern
                .clone()
                .ok_or_else(|| EditorError::NoMatchFound("no previous pattern".to_string()))?
        } else {
            pattern.to_string()
        };
        self.last_pattern = Some(pattern.clone());
        self.last_direction = direction;
        self.highlight = true;
        Ok(pattern)
    }

    /// Pattern and direction for `n` (`reverse = false`) or `N`.
    pub fn repeat(&self, reverse: bool) -> Result<(String, SearchDirection), EditorError> {
        let pattern = self
            .last_pattern
            .clone()
            .ok_or_else(|| EditorError::NoMatchFound("no previous pattern".to_string()))?;
        let direction = if reverse {
            self.last_direction.reversed()
        } else {
            self.last_direction
        };
        Ok((pattern, direction))
    }
}

/// Convert a byte offset to a grapheme column, rounding down inside a cluster
/// (or up when `round_up`).
fn byte_to_col(line: &str, byte: usize, round_up: bool) -> usize {
    let mut col = 0;
    for (start, g) in line.grapheme_indices(true) {
        let end = start + g.len();
        if end <= byte {
            col += 1;
        } else {
            if round_up && start < byte {
                col += 1;
            }
            break;
        }
    }
    col
}

/// All non-empty matches on one line.
pub fn matches_in_line(
    buffer: &Buffer,
    line: usize,
    pattern: &str,
    ignore_case: bool,
    matcher: &dyn PatternMatcher,
) -> Result<Vec<SearchMatch>, EditorError> {
    let Some(text) = buffer.line(line) else {
        return Ok(Vec::new());
    };
    let ranges = matcher.find_all(pattern, &text, ignore_case)?;
    Ok(usable_ranges(&text, ranges)
        .into_iter()
        .filter(|r| !r.is_empty())
        .map(|r| SearchMatch {
            line,
            start_col: byte_to_col(&text, r.start, false),
            end_col: byte_to_col(&text, r.end, true),
        })
        .collect())
}

/// Find the next match strictly after (or before) `from`.
pub fn find_next(
    buffer: &Buffer,
    from: Position,
    pattern: &str,
    direction: SearchDirection,
    options: SearchOptions,
    matcher: &dyn PatternMatcher,
) -> Result<SearchMatch, EditorError> {
    let line_count = buffer.line_count();
    let scan = |line: usize| matches_in_line(buffer, line, pattern, options.ignore_case, matcher);

    match direction {
        SearchDirection::Forward => {
            for line in from.line..line_count {
                if let Some(m) = scan(line)?.into_iter().find(|m| m.start() > from) {
                    return Ok(m);
                }
            }
            if options.wrap_scan {
                for line in 0..=from.line.min(line_count.saturating_sub(1)) {
                    if let Some(m) = scan(line)?.into_iter().next() {
                        debug!("search wrapped to top");
                        return Ok(m);
                    }
                }
            }
        }
        SearchDirection::Backward => {
            for line in (0..=from.line.min(line_count.saturating_sub(1))).rev() {
                if let Some(m) = scan(line)?.into_iter().rev().find(|m| m.start() < from) {
                    return Ok(m);
                }
            }
            if options.wrap_scan {
                for line in (from.line..line_count).rev() {
                    if let Some(m) = scan(line)?.into_iter().next_back() {
                        debug!("search wrapped to bottom");
                        return Ok(m);
                    }
                }
            }
        }
    }
    Err(EditorError::NoMatchFound(pattern.to_string()))
}
