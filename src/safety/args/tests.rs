use super::*;
use proptest::prelude::*;

#[test]
fn accepts_plain_flags() {
    assert!(validate_extra_args("-sV -p 22,80", 2048).is_ok());
}

#[test]
fn accepts_exactly_max_len() {
    let args = "a".repeat(2048);
    assert!(validate_extra_args(&args, 2048).is_ok());
}

#[test]
fn rejects_one_past_max_len() {
    let args = "a".repeat(2049);
    let err = validate_extra_args(&args, 2048).unwrap_err();
    assert!(err.contains("2049"));
}

#[test]
fn rejects_each_denied_metachar() {
    for ch in DENIED_METACHARS {
        let args = format!("-p 80{}id", ch);
        assert!(
            validate_extra_args(&args, 2048).is_err(),
            "metachar {:?} slipped through",
            ch
        );
    }
}

#[test]
fn rejects_shell_injection_attempt() {
    let err = validate_extra_args("-p 80; rm -rf /", 2048).unwrap_err();
    assert!(err.contains("metacharacter"));
}

#[test]
fn tokenize_empty_is_empty() {
    assert!(tokenize("").unwrap().is_empty());
    assert!(tokenize("   ").unwrap().is_empty());
}

#[test]
fn tokenize_splits_on_whitespace() {
    assert_eq!(
        tokenize("-sV -p 22,80").unwrap(),
        vec!["-sV", "-p", "22,80"]
    );
}

#[test]
fn tokenize_honors_quotes() {
    assert_eq!(tokenize("-p '22,80'").unwrap(), vec!["-p", "22,80"]);
    assert_eq!(tokenize("\"--top-ports=100\"").unwrap(), vec!["--top-ports=100"]);
}

#[test]
fn tokenize_rejects_unbalanced_quotes() {
    let err = tokenize("-p '22,80").unwrap_err();
    assert!(err.contains("quoting"));
}

#[test]
fn tokenize_names_the_bad_token() {
    let err = tokenize("-p 'has space'").unwrap_err();
    assert!(err.contains("has space"));
}

#[test]
fn tokenize_rejects_charset_violations() {
    assert!(tokenize("--script=*").is_err());
    assert!(tokenize("a!b").is_err());
    assert!(tokenize("under_score").is_err());
}

#[test]
fn tokenize_allows_full_charset() {
    let tokens = tokenize("-oX /tmp/out.xml user@host:22 a=b,c+d%20 100%").unwrap();
    assert_eq!(tokens.len(), 4);
}

#[test]
fn allow_list_permits_prefix_match() {
    let tokens: Vec<String> = vec!["--timeout=30".into(), "22,80".into()];
    assert!(enforce_allow_list(&tokens, &["--timeout", "-p"]).is_ok());
}

#[test]
fn allow_list_rejects_unknown_flag() {
    let tokens: Vec<String> = vec!["--script".into()];
    let err = enforce_allow_list(&tokens, &["-p", "-sV"]).unwrap_err();
    assert!(err.contains("--script"));
}

#[test]
fn allow_list_ignores_value_tokens() {
    let tokens: Vec<String> = vec!["22,80".into(), "dir".into()];
    assert!(enforce_allow_list(&tokens, &["-p"]).is_ok());
}

#[test]
fn empty_allow_list_is_unrestricted() {
    let tokens: Vec<String> = vec!["--anything".into()];
    assert!(enforce_allow_list(&tokens, &[]).is_ok());
}

proptest! {
    // Tokenizing, joining with single spaces, and re-tokenizing is a fixpoint
    // for any token list drawn from the permitted charset.
    #[test]
    fn tokenize_join_round_trip(tokens in proptest::collection::vec("[A-Za-z0-9.:/=+,@%-]{1,12}", 0..8)) {
        let joined = tokens.join(" ");
        let reparsed = tokenize(&joined).unwrap();
        prop_assert_eq!(reparsed, tokens);
    }
}
