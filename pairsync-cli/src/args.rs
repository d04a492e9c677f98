//! Command-line cleanup before clap sees it.
//!
//! - `src <csv> db <uri> pair <file>` becomes `--src <csv> --db <uri> --pair <file>`.
//! - A missing subcommand defaults to `sync`.
//! - Anything unrecognised is dropped and reported back to the caller.

const SUBCOMMANDS: &[&str] = &["sync", "diff"];
const VALUE_FLAGS: &[&str] = &["--src", "--db", "--pair", "--retry", "--retry-delay-ms"];
const SWITCHES: &[&str] = &["--dry-run", "--json", "-v", "--verbose", "-h", "--help"];
const TOP_LEVEL: &[&str] = &["-h", "--help", "-V", "--version"];
const LEGACY_WORDS: &[&str] = &["src", "db", "pair"];

/// Arguments ready for clap, plus whatever was thrown away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub args: Vec<String>,
    pub dropped: Vec<String>,
}

pub fn normalize(raw: impl IntoIterator<Item = String>) -> Normalized {
    let mut raw = raw.into_iter();
    let program = raw.next().unwrap_or_else(|| "pairsync".to_string());
    let rest: Vec<String> = raw.collect();

    // `pairsync help sync` and friends go through untouched.
    if rest.first().map(String::as_str) == Some("help") {
        return Normalized {
            args: std::iter::once(program).chain(rest).collect(),
            dropped: Vec::new(),
        };
    }

    let mut subcommand: Option<String> = None;
    let mut kept = Vec::new();
    let mut dropped = Vec::new();
    let mut iter = rest.into_iter();
    while let Some(arg) = iter.next() {
        let flag_name = arg.split_once('=').map_or(arg.as_str(), |(name, _)| name);
        if subcommand.is_none() && kept.is_empty() && TOP_LEVEL.contains(&arg.as_str()) {
            // `pairsync --version` / `pairsync --help` address the binary itself.
            return Normalized {
                args: vec![program, arg],
                dropped,
            };
        } else if VALUE_FLAGS.contains(&arg.as_str()) {
            kept.push(arg);
            kept.extend(iter.next());
        } else if VALUE_FLAGS.contains(&flag_name) || SWITCHES.contains(&arg.as_str()) {
            kept.push(arg);
        } else if LEGACY_WORDS.contains(&arg.as_str()) {
            kept.push(format!("--{arg}"));
            kept.extend(iter.next());
        } else if subcommand.is_none() && SUBCOMMANDS.contains(&arg.as_str()) {
            subcommand = Some(arg);
        } else {
            dropped.push(arg);
        }
    }

    let mut args = Vec::with_capacity(kept.len() + 2);
    args.push(program);
    args.push(subcommand.unwrap_or_else(|| "sync".to_string()));
    args.extend(kept);
    Normalized { args, dropped }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(args: &[&str]) -> Normalized {
        normalize(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn legacy_words_become_flags_under_sync() {
        let n = norm(&["pairsync", "src", "a.csv", "db", "memory:", "pair", "p.yaml"]);
        assert_eq!(
            n.args,
            vec!["pairsync", "sync", "--src", "a.csv", "--db", "memory:", "--pair", "p.yaml"]
        );
        assert!(n.dropped.is_empty());
    }

    #[test]
    fn unknown_arguments_are_dropped() {
        let n = norm(&["pairsync", "diff", "--src", "a.csv", "--frobnicate", "stray"]);
        assert_eq!(n.args, vec!["pairsync", "diff", "--src", "a.csv"]);
        assert_eq!(n.dropped, vec!["--frobnicate", "stray"]);
    }

    #[test]
    fn subcommand_moves_to_the_front() {
        let n = norm(&["pairsync", "-v", "--src=a.csv", "sync", "--dry-run"]);
        assert_eq!(n.args, vec!["pairsync", "sync", "-v", "--src=a.csv", "--dry-run"]);
    }

    #[test]
    fn flag_values_are_never_mistaken_for_words() {
        let n = norm(&["pairsync", "--pair", "sync", "--src", "db"]);
        assert_eq!(n.args, vec!["pairsync", "sync", "--pair", "sync", "--src", "db"]);
    }

    #[test]
    fn bare_version_and_help_pass_through() {
        assert_eq!(norm(&["pairsync", "--version"]).args, vec!["pairsync", "--version"]);
        assert_eq!(norm(&["pairsync", "help", "sync"]).args, vec!["pairsync", "help", "sync"]);
        assert_eq!(norm(&["pairsync"]).args, vec!["pairsync", "sync"]);
    }
}
