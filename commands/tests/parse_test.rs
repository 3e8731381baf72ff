//! End-to-end parsing: tokenize a typed line, then resolve the command
//! words against the trie the way the shell does.

use commands::{tokenize, CommandTrie, ResolveError, Token};

fn trie() -> CommandTrie {
    let mut t = CommandTrie::new();
    for (words, target) in [
        (["access", "disk"], "access_disk"),
        (["access", "dns"], "access_dns"),
        (["user", "info"], "user_info"),
    ] {
        let words: Vec<String> = words.iter().map(|w| w.to_string()).collect();
        t.insert(&words, target).unwrap();
    }
    t
}

fn leading_words(tokens: &[Token]) -> Vec<String> {
    tokens
        .iter()
        .map_while(|t| t.as_word().map(String::from))
        .collect()
}

#[test]
fn abbreviated_line_resolves_with_arguments_left_over() {
    let tokens = tokenize("acc disk add user1 /home").unwrap();
    let words = leading_words(&tokens);
    let path = trie().resolve(&words).unwrap();
    assert_eq!(path, vec!["access", "disk", "access_disk"]);

    // Everything past the command words is an argument.
    let consumed = path.len() - 1;
    let args: Vec<&Token> = tokens[consumed..].iter().collect();
    assert_eq!(args.len(), 3);
    assert_eq!(args[0].as_word(), Some("add"));
}

#[test]
fn grouped_argument_stops_word_collection() {
    let tokens = tokenize("user info (jdoe jsmith)").unwrap();
    let words = leading_words(&tokens);
    assert_eq!(words, vec!["user", "info"]);
    let path = trie().resolve(&words).unwrap();
    assert_eq!(path.last().map(String::as_str), Some("user_info"));
    assert_eq!(
        tokens[2],
        Token::Group(vec!["jdoe".to_string(), "jsmith".to_string()])
    );
}

#[test]
fn quoted_argument_keeps_spaces() {
    let tokens = tokenize("user info \"John Doe\"").unwrap();
    assert_eq!(tokens[2].as_word(), Some("John Doe"));
}

#[test]
fn ambiguous_line_reports_candidates() {
    let tokens = tokenize("acc d foo").unwrap();
    let words = leading_words(&tokens);
    assert_eq!(
        trie().resolve(&words).unwrap_err(),
        ResolveError::AmbiguousCommand(vec!["disk".to_string(), "dns".to_string()])
    );
}
