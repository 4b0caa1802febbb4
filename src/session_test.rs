use super::*;

fn session() -> Session {
    Session::new(false, UserAgent::new("test", "0.0"))
}

fn connected_session() -> Session {
    let mut session = session();
    assert!(session.begin_connecting());
    assert!(session.socket_opened());
    session
}

#[test]
fn transport_walks_the_happy_path() {
    let mut session = session();
    assert_eq!(session.transport_state(), TransportState::Offline);

    assert!(session.begin_connecting());
    assert_eq!(session.transport_state(), TransportState::Connecting);

    assert!(session.socket_opened());
    assert_eq!(session.transport_state(), TransportState::Connected);

    assert!(session.begin_reconnect());
    assert_eq!(session.transport_state(), TransportState::Reconnecting);

    assert!(session.reconnected());
    assert_eq!(session.transport_state(), TransportState::Connected);
}

#[test]
fn open_is_refused_unless_offline() {
    let mut session = connected_session();
    assert!(!session.begin_connecting());
    assert_eq!(session.transport_state(), TransportState::Connected);
}

#[test]
fn socket_open_is_refused_while_reconnecting() {
    let mut session = connected_session();
    assert!(session.begin_reconnect());

    assert!(!session.socket_opened());
    assert_eq!(session.transport_state(), TransportState::Reconnecting);
}

#[test]
fn socket_close_is_ignored_while_reconnecting() {
    let mut session = connected_session();
    assert!(session.begin_reconnect());

    assert!(!session.socket_closed());
    assert_eq!(session.transport_state(), TransportState::Reconnecting);
}

#[test]
fn socket_close_drops_connecting_and_connected_to_offline() {
    let mut session = session();
    assert!(session.begin_connecting());
    assert!(session.socket_closed());
    assert_eq!(session.transport_state(), TransportState::Offline);

    let mut session = connected_session();
    assert!(session.socket_closed());
    assert_eq!(session.transport_state(), TransportState::Offline);
}

#[test]
fn user_close_resets_both_machines() {
    let mut session = connected_session();
    session.stranger_found("ckey-1");
    session.closed_by_user();

    assert_eq!(session.transport_state(), TransportState::Offline);
    assert_eq!(session.client_state(), ClientState::Idle);
    assert!(session.current_contact().is_none());
}

#[test]
fn search_only_starts_from_idle() {
    let mut session = connected_session();
    assert!(session.begin_search());
    assert_eq!(session.client_state(), ClientState::SearchingForStranger);
    assert!(!session.begin_search());
}

#[test]
fn stranger_found_records_contact_before_chatting() {
    let mut session = connected_session();
    assert!(session.begin_search());

    session.stranger_found("abc");
    assert_eq!(session.client_state(), ClientState::Chatting);
    assert_eq!(session.current_contact(), Some("abc"));
}

#[test]
fn stranger_found_rolls_the_previous_contact() {
    let mut session = connected_session();
    session.stranger_found("first");
    assert!(session.conversation_ended());
    session.stranger_found("second");

    let context = ReconnectContext::snapshot(&session);
    assert_eq!(context.current_contact.as_deref(), Some("second"));
    assert_eq!(context.previous_contact.as_deref(), Some("first"));
}

#[test]
fn conversation_end_requires_chatting() {
    let mut session = connected_session();
    assert!(!session.conversation_ended());

    session.stranger_found("abc");
    assert!(session.conversation_ended());
    assert_eq!(session.client_state(), ClientState::Idle);
    assert!(session.current_contact().is_none());
}

#[test]
fn guards_refuse_every_action_when_not_connected() {
    let session = session();
    for action in [
        ConversationAction::Search,
        ConversationAction::SendMessage,
        ConversationAction::Disconnect,
        ConversationAction::Flag,
        ConversationAction::Chatstate,
        ConversationAction::RandomTopic,
    ] {
        assert!(!session.allows(action), "{action:?} allowed while offline");
    }
}

#[test]
fn guards_split_search_from_conversation_actions() {
    let mut session = connected_session();
    assert!(session.allows(ConversationAction::Search));
    assert!(!session.allows(ConversationAction::SendMessage));

    session.stranger_found("abc");
    assert!(!session.allows(ConversationAction::Search));
    for action in [
        ConversationAction::SendMessage,
        ConversationAction::Disconnect,
        ConversationAction::Flag,
        ConversationAction::Chatstate,
        ConversationAction::RandomTopic,
    ] {
        assert!(session.allows(action), "{action:?} refused while chatting");
    }
}

#[test]
fn action_counter_starts_at_zero_and_only_bumps_on_request() {
    let mut session = connected_session();
    assert_eq!(session.action_counter(), 0);

    session.stranger_found("abc");
    session.note_post_id(12);
    assert_eq!(session.action_counter(), 0);

    session.bump_action_counter();
    session.bump_action_counter();
    assert_eq!(session.action_counter(), 2);
}

#[test]
fn note_post_id_ignores_the_sentinel() {
    let mut session = connected_session();
    session.note_post_id(7);
    session.note_post_id(crate::events::POST_ID_NONE);

    let context = ReconnectContext::snapshot(&session);
    assert_eq!(context.last_post_id, 7);
}

#[test]
fn snapshot_captures_loss_time_fields() {
    let mut session = connected_session();
    session.connection_accepted("conn-9".to_owned());
    session.stranger_found("abc");
    session.note_post_id(31);

    let context = ReconnectContext::snapshot(&session);
    assert_eq!(context.client_state, ClientState::Chatting);
    assert_eq!(context.current_contact.as_deref(), Some("abc"));
    assert_eq!(context.last_connection_id.as_deref(), Some("conn-9"));
    assert_eq!(context.last_post_id, 31);
    assert!(context.connection_started.is_some());
}
