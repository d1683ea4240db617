//! Integration tests for the lobby registry.

use std::collections::HashSet;

use lobbyrelay_lobby::{LobbyConfig, LobbyError, LobbyRegistry};
use lobbyrelay_protocol::{LobbyCode, PeerId};

fn registry() -> LobbyRegistry {
    LobbyRegistry::with_seed(LobbyConfig::default(), 11)
}

fn pid(id: u32) -> PeerId {
    PeerId(id)
}

/// Creates a lobby with a generated code and `members` joined in order.
fn open_lobby(registry: &mut LobbyRegistry, members: &[u32]) -> LobbyCode {
    let code = registry.generate_code().unwrap();
    let lobby = registry.create(code.clone(), None).unwrap();
    for &id in members {
        lobby.add_member(pid(id));
    }
    code
}

// =========================================================================
// Code generation
// =========================================================================

#[test]
fn test_generate_code_default_shape() {
    let mut registry = registry();

    let code = registry.generate_code().unwrap();

    assert_eq!(code.as_str().len(), 5);
    assert!(code.as_str().chars().all(|c| c.is_ascii_uppercase()));
    assert!(registry.was_issued(&code));
}

#[test]
fn test_generate_code_never_repeats() {
    let mut registry = registry();

    let codes: HashSet<LobbyCode> = (0..2_000).map(|_| registry.generate_code().unwrap()).collect();

    assert_eq!(codes.len(), 2_000);
}

#[test]
fn test_generate_code_not_reused_after_lobby_removed() {
    // Two-letter code space: after both codes are issued nothing is left,
    // even once their lobbies are gone.
    let config = LobbyConfig {
        code_length: 1,
        code_alphabet: "AB".into(),
        max_code_attempts: 200,
    };
    let mut registry = LobbyRegistry::with_seed(config, 5);

    let first = open_lobby(&mut registry, &[1]);
    let second = open_lobby(&mut registry, &[2]);
    assert_ne!(first, second);

    registry.remove(&first).unwrap();
    registry.remove(&second).unwrap();

    let result = registry.generate_code();
    assert!(matches!(
        result,
        Err(LobbyError::CodeSpaceExhausted { attempts: 200 })
    ));
}

#[test]
fn test_generate_code_empty_alphabet_is_invalid() {
    let config = LobbyConfig {
        code_alphabet: String::new(),
        ..LobbyConfig::default()
    };
    let mut registry = LobbyRegistry::with_seed(config, 1);

    assert!(matches!(
        registry.generate_code(),
        Err(LobbyError::InvalidConfig(_))
    ));
}

#[test]
fn test_generate_code_custom_alphabet_and_length() {
    let config = LobbyConfig {
        code_length: 8,
        code_alphabet: "0123456789".into(),
        ..LobbyConfig::default()
    };
    let mut registry = LobbyRegistry::with_seed(config, 1);

    let code = registry.generate_code().unwrap();

    assert_eq!(code.as_str().len(), 8);
    assert!(code.as_str().chars().all(|c| c.is_ascii_digit()));
}

// =========================================================================
// create / find / remove
// =========================================================================

#[test]
fn test_create_duplicate_code_rejected() {
    let mut registry = registry();
    registry.create(LobbyCode::from("ABCDE"), None).unwrap();

    let result = registry.create(LobbyCode::from("ABCDE"), None);

    assert!(matches!(result, Err(LobbyError::DuplicateLobbyCode(code)) if code.as_str() == "ABCDE"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_create_with_description() {
    let mut registry = registry();

    let lobby = registry
        .create(LobbyCode::from("QXTRB"), Some("ranked".into()))
        .unwrap();

    assert_eq!(lobby.description.as_deref(), Some("ranked"));
    assert!(lobby.is_empty());
}

#[test]
fn test_find_by_peer_returns_the_members_lobby() {
    let mut registry = registry();
    let a = open_lobby(&mut registry, &[1, 2]);
    let b = open_lobby(&mut registry, &[3]);

    assert_eq!(registry.find_by_peer(pid(2)).unwrap().code(), &a);
    assert_eq!(registry.find_by_peer(pid(3)).unwrap().code(), &b);
    assert!(registry.find_by_peer(pid(4)).is_none());
}

#[test]
fn test_remove_unknown_lobby_returns_not_found() {
    let mut registry = registry();

    let result = registry.remove(&LobbyCode::from("ZZZZZ"));

    assert!(matches!(result, Err(LobbyError::NotFound(_))));
}

#[test]
fn test_iteration_and_summaries_keep_creation_order() {
    let mut registry = registry();
    let first = open_lobby(&mut registry, &[1]);
    let second = open_lobby(&mut registry, &[2]);
    let third = open_lobby(&mut registry, &[3]);

    registry.remove(&second).unwrap();

    assert_eq!(registry.codes(), vec![first.clone(), third.clone()]);
    let summaries = registry.summaries();
    assert_eq!(summaries[0].code, first);
    assert_eq!(summaries[1].code, third);
}

// =========================================================================
// join
// =========================================================================

#[test]
fn test_join_appends_after_host() {
    let mut registry = registry();
    let code = open_lobby(&mut registry, &[1]);

    let lobby = registry.join(&code, pid(2)).unwrap();

    assert_eq!(lobby.members(), &[pid(1), pid(2)]);
    assert_eq!(lobby.host(), Some(pid(1)));
}

#[test]
fn test_join_when_already_in_a_lobby_rejected() {
    let mut registry = registry();
    let mine = open_lobby(&mut registry, &[1]);
    let other = open_lobby(&mut registry, &[2]);

    let result = registry.join(&other, pid(1));

    assert!(matches!(result, Err(LobbyError::AlreadyInLobby(p, code)) if p == pid(1) && code == mine));
    assert_eq!(registry.find_by_code(&other).unwrap().len(), 1);
}

#[test]
fn test_join_unknown_code_returns_not_found() {
    let mut registry = registry();

    let result = registry.join(&LobbyCode::from("NOPE0"), pid(1));

    assert!(matches!(result, Err(LobbyError::NotFound(code)) if code.as_str() == "NOPE0"));
}
