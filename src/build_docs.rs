//! Offline documentation build.
//!
//! Produces a self-contained docs directory: the static Swagger UI assets plus an
//! `index.html` with the OpenAPI document compiled in. Any previous build in the
//! target directory is removed first.

use crate::openapi_builder::build_openapi_spec;
use crate::registry::Api;
use crate::serializer::{serialize_json_compact, write_to_file};
use crate::settings::Settings;
use crate::template::render_index;
use anyhow::{Context, Result};
use log::debug;
use regex::Regex;
use std::fs;
use std::io::Write;
use std::path::Path;
use walkdir::WalkDir;

/// Shell-style name patterns (`*.map`, `test_?`, `[!a]*`) matched against file and
/// directory names while copying.
pub struct IgnorePatterns {
    patterns: Vec<Regex>,
}

impl IgnorePatterns {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let Some(translated) = translate_pattern(pattern) else {
                debug!("Ignore pattern {} can never match", pattern);
                continue;
            };
            compiled.push(
                Regex::new(&translated)
                    .with_context(|| format!("Invalid ignore pattern: {}", pattern))?,
            );
        }
        Ok(Self { patterns: compiled })
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(name))
    }
}

fn escape_char(c: char) -> String {
    regex::escape(c.encode_utf8(&mut [0; 4]))
}

/// Translate a shell-style pattern to an anchored regular expression.
///
/// Returns `None` for a pattern that cannot match any name, such as one whose
/// only bracket range is reversed.
fn translate_pattern(pattern: &str) -> Option<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut translated = String::from("^");
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        match c {
            '*' => translated.push_str(".*"),
            '?' => translated.push('.'),
            '[' => {
                // A leading `!` negates, a `]` right after `[` or `[!` is literal.
                let mut j = i;
                if chars.get(j) == Some(&'!') {
                    j += 1;
                }
                if chars.get(j) == Some(&']') {
                    j += 1;
                }
                while j < chars.len() && chars[j] != ']' {
                    j += 1;
                }
                if j >= chars.len() {
                    translated.push_str(&escape_char('['));
                    continue;
                }
                let body = &chars[i..j];
                i = j + 1;
                translated.push_str(&translate_class(body)?);
            }
            other => translated.push_str(&escape_char(other)),
        }
    }
    translated.push('$');
    Some(translated)
}

/// Translate the inside of a bracket expression; every member is escaped so
/// regex class syntax (`^`, `[`, `&&`, `--`, `~~`) stays literal.
fn translate_class(body: &[char]) -> Option<String> {
    let (negated, body) = match body.split_first() {
        Some(('!', rest)) => (true, rest),
        _ => (false, body),
    };

    let mut members = String::new();
    let mut k = 0;
    while k < body.len() {
        let low = body[k];
        if k + 2 < body.len() && body[k + 1] == '-' {
            let high = body[k + 2];
            k += 3;
            if low > high {
                continue;
            }
            members.push_str(&escape_char(low));
            members.push('-');
            members.push_str(&escape_char(high));
        } else {
            members.push_str(&escape_char(low));
            k += 1;
        }
    }

    match (members.is_empty(), negated) {
        (true, false) => None,
        (true, true) => Some(".".to_string()),
        (false, false) => Some(format!("[{}]", members)),
        (false, true) => Some(format!("[^{}]", members)),
    }
}

/// Copy `source` into `dest`, skipping entries whose name matches `ignore`
pub fn copy_tree(source: &Path, dest: &Path, ignore: &IgnorePatterns) -> Result<usize> {
    if !source.is_dir() {
        anyhow::bail!("Static directory does not exist: {}", source.display());
    }

    let mut copied = 0;
    for entry in WalkDir::new(source)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !ignore.is_ignored(&e.file_name().to_string_lossy()))
    {
        let entry = entry.with_context(|| format!("Failed to walk {}", source.display()))?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .with_context(|| format!("{} is outside {}", entry.path().display(), source.display()))?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create directory: {}", target.display()))?;
        } else {
            debug!("Copying {} to {}", entry.path().display(), target.display());
            fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// The `build-docs` command
pub struct DocsBuilder<'a> {
    settings: &'a Settings,
    apis: &'a [Api],
}

impl<'a> DocsBuilder<'a> {
    pub fn new(settings: &'a Settings, apis: &'a [Api]) -> Self {
        Self { settings, apis }
    }

    /// Render `index.html` with the static assets next to it
    pub fn compile_index(&self) -> Result<String> {
        let document = build_openapi_spec(self.settings, self.apis, None)?;
        let json_spec = serialize_json_compact(&document)?;
        Ok(render_index(&self.settings.index_title, "./", &json_spec))
    }

    /// Run the whole build, reporting progress to `out`
    pub fn run<W: Write>(&self, out: &mut W) -> Result<()> {
        let dest_dir = self.settings.docs_dir()?;

        // A failed compile must leave the previous build untouched.
        writeln!(out, "Compiling index.html, please wait patiently.")?;
        let index = self.compile_index()?;

        if dest_dir.exists() {
            writeln!(out, "Remove outdated api docs:{}.", dest_dir.display())?;
            fs::remove_dir_all(dest_dir)
                .with_context(|| format!("Failed to remove {}", dest_dir.display()))?;
        }

        writeln!(out, "Copy static files to {}.", dest_dir.display())?;
        let ignore = IgnorePatterns::new(&self.settings.ignore_pattern_list)?;
        let copied = copy_tree(&self.settings.static_dir, dest_dir, &ignore)?;
        debug!("Copied {} static file(s)", copied);

        let index_path = dest_dir.join("index.html");
        writeln!(out, "Copy index.html to {}.", index_path.display())?;
        write_to_file(&index, &index_path)?;

        writeln!(out, "Done!")?;
        Ok(())
    }
}
