// src/ex.rs - Command-line (ex) command parsing and substitution

use crate::buffer::Buffer;
use crate::error::EditorError;
use crate::search::{self, PatternMatcher};
use std::path::PathBuf;

/// Lines a substitution applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubstituteScope {
    #[default]
    CurrentLine,
    WholeBuffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubstituteFlags {
    /// `g`: every match on a line, not only the first
    pub global: bool,
    /// `i` forces case-insensitive, `I` case-sensitive; unset follows config
    pub ignore_case: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitute {
    pub scope: SubstituteScope,
    pub pattern: String,
    pub replacement: String,
    pub flags: SubstituteFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubstituteResult {
    /// Replacements made
    pub count: usize,
    /// Lines changed
    pub lines: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExCommand {
    /// Empty command line
    Nop,
    Write { path: Option<PathBuf>, force: bool },
    Quit { force: bool },
    WriteQuit,
    /// `:x`: write only when modified, then quit
    WriteIfModifiedQuit,
    Edit { path: Option<PathBuf>, force: bool },
    Buffer(u64),
    BufferNext,
    BufferPrev,
    BufferDelete { id: Option<u64>, force: bool },
    ListBuffers,
    /// 1-based line number
    GotoLine(usize),
    NoHighlight,
    Substitute(Substitute),
}

impl ExCommand {
    pub fn parse(input: &str) -> Result<ExCommand, EditorError> {
        let line = input.trim();
        let invalid = || EditorError::InvalidCommand(line.to_string());
        if line.is_empty() {
            return Ok(ExCommand::Nop);
        }
        if line.chars().all(|c| c.is_ascii_digit()) {
            return line
                .parse::<usize>()
                .map(ExCommand::GotoLine)
                .map_err(|_| invalid());
        }
        if let Some(rest) = line.strip_prefix('%') {
            return parse_substitute(rest, SubstituteScope::WholeBuffer)
                .map(ExCommand::Substitute);
        }
        if let Some(rest) = line.strip_prefix('.') {
            return parse_substitute(rest, SubstituteScope::CurrentLine)
                .map(ExCommand::Substitute);
        }

        let name_len = line
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(line.len());
        let name = &line[..name_len];
        let rest = &line[name_len..];
        if matches!(name, "s" | "substitute") {
            return parse_substitute(line, SubstituteScope::CurrentLine).map(ExCommand::Substitute);
        }
        let (force, args) = match rest.strip_prefix('!') {
            Some(args) => (true, args.trim()),
            None => (false, rest.trim()),
        };
        let path = (!args.is_empty()).then(|| PathBuf::from(args));
        let number = || args.parse::<u64>().map_err(|_| invalid());

        let command = match name {
            "w" | "write" => ExCommand::Write { path, force },
            "q" | "quit" if args.is_empty() => ExCommand::Quit { force },
            "wq" if args.is_empty() => ExCommand::WriteQuit,
            "x" | "xit" if args.is_empty() => ExCommand::WriteIfModifiedQuit,
            "e" | "edit" => ExCommand::Edit { path, force },
            "b" | "buffer" => ExCommand::Buffer(number()?),
            "bn" | "bnext" if args.is_empty() => ExCommand::BufferNext,
            "bp" | "bprev" | "bprevious" if args.is_empty() => ExCommand::BufferPrev,
            "bd" | "bdelete" => ExCommand::BufferDelete {
                id: if args.is_empty() { None } else { Some(number()?) },
                force,
            },
            "ls" | "buffers" if args.is_empty() => ExCommand::ListBuffers,
            "noh" | "nohlsearch" if args.is_empty() => ExCommand::NoHighlight,
            _ => return Err(invalid()),
        };
        Ok(command)
    }
}

/// Parse `s{delim}pattern{delim}replacement[{delim}flags]`.
fn parse_substitute(input: &str, scope: SubstituteScope) -> Result<Substitute, EditorError> {
    let invalid = || EditorError::InvalidCommand(input.to_string());
    let body = input
        .strip_prefix("substitute")
        .or_else(|| input.strip_prefix('s'))
        .ok_or_else(invalid)?;
    let delim = body.chars().next().ok_or_else(invalid)?;
    if delim.is_alphanumeric() || delim.is_whitespace() || delim == '\\' || delim == '"' {
        return Err(invalid());
    }
    let parts = split_unescaped(&body[delim.len_utf8()..], delim);
    if parts.len() < 2 || parts.len() > 3 {
        return Err(invalid());
    }
    let mut flags = SubstituteFlags::default();
    if let Some(raw) = parts.get(2) {
        for c in raw.trim().chars() {
            match c {
                'g' => flags.global = true,
                'i' => flags.ignore_case = Some(true),
                'I' => flags.ignore_case = Some(false),
                _ => return Err(invalid()),
            }
        }
    }
    Ok(Substitute {
        scope,
        pattern: parts[0].clone(),
        replacement: parts[1].clone(),
        flags,
    })
}

/// Split on `delim`, turning `\{delim}` into a literal delimiter and leaving
/// every other escape for the pattern or replacement to interpret.
fn split_unescaped(input: &str, delim: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) if next == delim => current.push(next),
                Some(next) => {
                    current.push('\\');
                    current.push(next);
                }
                None => current.push('\\'),
            }
        } else if c == delim {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    parts
}

/// Replacement text for one match: `&` is the match, `\&` a literal ampersand,
/// `\\` a backslash.
fn expand_replacement(replacement: &str, matched: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars();
    while let Some(c) = chars.next() {
        match c {
            '&' => out.push_str(matched),
            '\\' => match chars.next() {
                Some('t') => out.push('\t'),
                Some(next) => out.push(next),
                None => out.push('\\'),
            },
            _ => out.push(c),
        }
    }
    out
}

/// Apply a substitution to `buffer`. Fails with `NoMatchFound` when nothing
/// matched, leaving the buffer untouched.
pub fn apply_substitute(
    buffer: &mut Buffer,
    sub: &Substitute,
    current_line: usize,
    default_ignore_case: bool,
    matcher: &dyn PatternMatcher,
) -> Result<SubstituteResult, EditorError> {
    let ignore_case = sub.flags.ignore_case.unwrap_or(default_ignore_case);
    let lines = match sub.scope {
        SubstituteScope::CurrentLine => current_line..current_line + 1,
        SubstituteScope::WholeBuffer => 0..buffer.line_count(),
    };

    let mut result = SubstituteResult { count: 0, lines: 0 };
    for idx in lines {
        let Some(text) = buffer.line(idx) else {
            continue;
        };
        let mut ranges = search::usable_ranges(&text, matcher.find_all(&sub.pattern, &text, ignore_case)?);
        if ranges.is_empty() {
            continue;
        }
        if !sub.flags.global {
            ranges.truncate(1);
        }
        let mut replaced = String::with_capacity(text.len());
        let mut last = 0;
        for range in &ranges {
            replaced.push_str(&text[last..range.start]);
            replaced.push_str(&expand_replacement(&sub.replacement, &text[range.clone()]));
            last = range.end;
        }
        replaced.push_str(&text[last..]);
        result.count += ranges.len();
        result.lines += 1;
        if replaced != text {
            buffer.replace_line(idx, &replaced)?;
        }
    }

    if result.count == 0 {
        return Err(EditorError::NoMatchFound(sub.pattern.clone()));
    }
    Ok(result)
}
