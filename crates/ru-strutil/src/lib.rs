//! # ru-strutil
//!
//! Python-style string helpers for building branch lists, selections and
//! configuration strings.
//!
//! ```
//! use ru_strutil::{join, split, sjoin};
//!
//! assert_eq!(split("a,b,,c", ","), vec!["a", "b", "", "c"]);
//! assert_eq!(join(&["a", "", "b"], ",", true), "a,b");
//! assert_eq!(sjoin("pt eta  phi", " ", ":", true), "pt:eta:phi");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Split `text` on every occurrence of `separator`, keeping empty tokens.
///
/// An empty `separator` splits on runs of whitespace instead, like Python's
/// argument-less `str.split()`.
pub fn split(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.split_whitespace().map(str::to_string).collect();
    }
    text.split(separator).map(str::to_string).collect()
}

/// Join `tokens` with `joiner`. Blank (whitespace-only) tokens are skipped
/// when `remove_blanks` is set.
pub fn join<S: AsRef<str>>(tokens: &[S], joiner: &str, remove_blanks: bool) -> String {
    let kept: Vec<&str> = tokens
        .iter()
        .map(|t| t.as_ref())
        .filter(|t| !remove_blanks || !t.trim().is_empty())
        .collect();
    kept.join(joiner)
}

/// Replace `separator` by `joiner`: `join(split(text, separator), ..)`.
pub fn sjoin(text: &str, separator: &str, joiner: &str, remove_blanks: bool) -> String {
    join(&split(text, separator), joiner, remove_blanks)
}

/// Remove, in place, the trailing run of characters that appear in `chars`.
pub fn rstrip(text: &mut String, chars: &str) {
    let keep = text.trim_end_matches(|c: char| chars.contains(c)).len();
    text.truncate(keep);
}

/// Partition `tokens` into exactly `n` ordered chunks of near-equal length.
///
/// The first `len % n` chunks hold one extra element. When `n > len` the
/// trailing chunks are empty; `n == 0` gives no chunks.
pub fn chunk<S: AsRef<str>>(tokens: &[S], n: usize) -> Vec<Vec<String>> {
    if n == 0 {
        return Vec::new();
    }
    let (base, extra) = (tokens.len() / n, tokens.len() % n);
    let mut out = Vec::with_capacity(n);
    let mut start = 0;
    for i in 0..n {
        let len = base + usize::from(i < extra);
        out.push(tokens[start..start + len].iter().map(|t| t.as_ref().to_string()).collect());
        start += len;
    }
    out
}

/// Tokens containing `keyword`, in their original order.
pub fn filter<S: AsRef<str>>(tokens: &[S], keyword: &str) -> Vec<String> {
    tokens
        .iter()
        .map(|t| t.as_ref())
        .filter(|t| t.contains(keyword))
        .map(str::to_string)
        .collect()
}

/// Product selection expression `(a)*(b)*...` from the non-blank tokens.
///
/// With nothing left the expression is `"1"` (always pass).
pub fn formexpr<S: AsRef<str>>(tokens: &[S]) -> String {
    let kept: Vec<&str> =
        tokens.iter().map(|t| t.as_ref().trim()).filter(|t| !t.is_empty()).collect();
    if kept.is_empty() {
        return "1".to_string();
    }
    format!("({})", kept.join(")*("))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_empty_tokens() {
        assert_eq!(split("a,b,,c", ","), vec!["a", "b", "", "c"]);
        assert_eq!(split(",a,", ","), vec!["", "a", ""]);
        assert_eq!(split("", ","), vec![""]);
        assert_eq!(split("abc", ","), vec!["abc"]);
    }

    #[test]
    fn split_multichar_separator() {
        assert_eq!(split("x::y::z", "::"), vec!["x", "y", "z"]);
    }

    #[test]
    fn split_empty_separator_is_whitespace() {
        assert_eq!(split("  pt \teta\nphi ", ""), vec!["pt", "eta", "phi"]);
    }

    #[test]
    fn join_remove_blanks() {
        assert_eq!(join(&["a", "", "b"], ",", true), "a,b");
        assert_eq!(join(&["a", "", "b"], ",", false), "a,,b");
        assert_eq!(join(&["a", "  ", "b"], "+", true), "a+b");
        assert_eq!(join::<&str>(&[], ",", true), "");
    }

    #[test]
    fn sjoin_translates_separator() {
        assert_eq!(sjoin("a b  c", " ", ":", true), "a:b:c");
        assert_eq!(sjoin("a b  c", " ", ":", false), "a:b::c");
    }

    #[test]
    fn rstrip_trailing_run() {
        let mut s = String::from("value###");
        rstrip(&mut s, "#");
        assert_eq!(s, "value");

        let mut s = String::from("x #;# ");
        rstrip(&mut s, "# ;");
        assert_eq!(s, "x");

        let mut s = String::from("a#b");
        rstrip(&mut s, "#");
        assert_eq!(s, "a#b");

        let mut s = String::from("###");
        rstrip(&mut s, "#");
        assert_eq!(s, "");
    }

    #[test]
    fn chunk_near_equal() {
        let c = chunk(&["a", "b", "c", "d", "e"], 2);
        assert_eq!(c, vec![vec!["a", "b", "c"], vec!["d", "e"]]);

        let c = chunk(&["a", "b", "c", "d", "e"], 4);
        let sizes: Vec<usize> = c.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 1, 1, 1]);
    }

    #[test]
    fn chunk_degenerate_counts() {
        assert!(chunk(&["a", "b"], 0).is_empty());

        let c = chunk(&["a", "b"], 3);
        assert_eq!(c.len(), 3);
        assert_eq!(c[0], vec!["a"]);
        assert_eq!(c[1], vec!["b"]);
        assert!(c[2].is_empty());

        let c = chunk::<&str>(&[], 3);
        assert_eq!(c.len(), 3);
        assert!(c.iter().all(Vec::is_empty));
    }

    #[test]
    fn filter_by_substring() {
        let v = ["jet_pt", "lep_pt", "jet_eta", "met"];
        assert_eq!(filter(&v, "jet"), vec!["jet_pt", "jet_eta"]);
        assert_eq!(filter(&v, "_pt"), vec!["jet_pt", "lep_pt"]);
        assert!(filter(&v, "tau").is_empty());
    }

    #[test]
    fn formexpr_product() {
        assert_eq!(formexpr(&["nj>=2", " ", "met>50"]), "(nj>=2)*(met>50)");
        assert_eq!(formexpr::<&str>(&[]), "1");
        assert_eq!(formexpr(&["", "  "]), "1");
    }
}
