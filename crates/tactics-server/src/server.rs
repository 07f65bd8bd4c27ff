//! WebSocket server and connection handling.

use crate::protocol::{ClientMessage, RoomId, ServerMessage};
use crate::room::{GameRoom, RoomError};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tactics_core::{Action, ClientId, GameConfig, GameError, GameState, GameSummary};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState {
    /// All open rooms
    pub rooms: DashMap<RoomId, GameRoom>,
    next_room_id: AtomicU32,
    /// Mapping from client ID to their room ID; lobby clients are absent
    pub client_rooms: DashMap<ClientId, RoomId>,
    /// Mapping from client ID to their message sender
    pub client_senders: DashMap<ClientId, mpsc::UnboundedSender<ServerMessage>>,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            next_room_id: AtomicU32::new(0),
            client_rooms: DashMap::new(),
            client_senders: DashMap::new(),
        }
    }

    /// Open a new room running a fresh game
    pub fn add_game(&self, config: &GameConfig) -> Result<RoomId, GameError> {
        let game = GameState::new(config)?;
        let room_id = self.next_room_id.fetch_add(1, Ordering::Relaxed);
        self.rooms.insert(room_id, GameRoom::new(room_id, game));
        info!(room_id, seats = config.seats, "Opened room");
        Ok(room_id)
    }

    /// Send a message to a specific client.
    pub fn send_to_client(&self, client_id: ClientId, msg: ServerMessage) {
        if let Some(sender) = self.client_senders.get(&client_id) {
            let _ = sender.send(msg);
        }
    }

    /// Send a message to each of `clients`.
    pub fn send_to_clients(&self, clients: &[ClientId], msg: ServerMessage) {
        for &client_id in clients {
            self.send_to_client(client_id, msg.clone());
        }
    }

    /// Summaries of every room, keyed by room ID.
    pub fn game_list(&self) -> BTreeMap<RoomId, GameSummary> {
        self.rooms.iter().map(|r| (r.id, r.summary())).collect()
    }

    /// Send the room list to every connected client not in a room.
    pub fn broadcast_game_list(&self) {
        let games = self.game_list();
        let lobby: Vec<ClientId> = self
            .client_senders
            .iter()
            .map(|s| *s.key())
            .filter(|id| !self.client_rooms.contains_key(id))
            .collect();
        self.send_to_clients(&lobby, ServerMessage::GameList { games });
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Tactics server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let client_id = Uuid::new_v4();

    let welcome = ServerMessage::Welcome { client_id };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text.into())).await?;

    // Registered only once the client is reachable
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.client_senders.insert(client_id, tx);

    // New clients start in the lobby
    state.send_to_client(
        client_id,
        ServerMessage::GameList {
            games: state.game_list(),
        },
    );

    // Forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(client_id, client_msg, &state),
                Err(e) => {
                    warn!("Invalid message from {}: {}", client_id, text);
                    state.send_to_client(
                        client_id,
                        ServerMessage::Error {
                            message: format!("Invalid message: {}", e),
                        },
                    );
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", client_id);
                break;
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", client_id, e);
                break;
            }
            _ => {}
        }
    }

    handle_disconnect(client_id, &state);
    state.client_senders.remove(&client_id);
    send_task.abort();

    info!("Connection closed for {}", client_id);
    Ok(())
}

/// Handle a client message.
pub fn handle_message(client_id: ClientId, msg: ClientMessage, state: &ServerState) {
    match msg {
        ClientMessage::JoinGame { room_id } => join_game(client_id, room_id, state),

        ClientMessage::LeaveGame => {
            leave_game(client_id, state);
            state.send_to_client(
                client_id,
                ServerMessage::GameList {
                    games: state.game_list(),
                },
            );
        }

        ClientMessage::Action { action } => {
            if let Err(e) = relay_action(client_id, action, state) {
                debug!("Rejected action from {}: {}", client_id, e);
            }
        }

        ClientMessage::CreateGame { config } => match state.add_game(&config) {
            Ok(room_id) => {
                info!("Client {} created room {}", client_id, room_id);
                state.broadcast_game_list();
            }
            Err(e) => {
                state.send_to_client(
                    client_id,
                    ServerMessage::Error {
                        message: e.to_string(),
                    },
                );
            }
        },

        ClientMessage::ListGames => {
            state.send_to_client(
                client_id,
                ServerMessage::GameList {
                    games: state.game_list(),
                },
            );
        }

        ClientMessage::Ping => {
            state.send_to_client(client_id, ServerMessage::Pong);
        }
    }
}

/// Move a client into a room, seating them if a seat is free.
fn join_game(client_id: ClientId, room_id: RoomId, state: &ServerState) {
    if !state.rooms.contains_key(&room_id) {
        warn!("Client {} asked for missing room {}", client_id, room_id);
        state.send_to_client(client_id, ServerMessage::Kick);
        state.send_to_client(
            client_id,
            ServerMessage::GameList {
                games: state.game_list(),
            },
        );
        return;
    }

    let rejoining = state.client_rooms.get(&client_id).map(|r| *r) == Some(room_id);
    if !rejoining {
        leave_game(client_id, state);
    }

    let Some(mut room) = state.rooms.get_mut(&room_id) else {
        state.send_to_client(client_id, ServerMessage::Kick);
        return;
    };
    let previous_seat = room.seat_of(client_id);
    let seat = room.join(client_id);
    let seat_taken = previous_seat.is_none() && seat.is_some();
    let snapshot = room.snapshot();
    let update = room.game.players_update();
    let others = room.others(client_id);
    drop(room); // Release lock before sending

    state.client_rooms.insert(client_id, room_id);
    match seat {
        Some(seat) => info!("Client {} took seat {} in room {}", client_id, seat, room_id),
        None => info!("Client {} is spectating room {}", client_id, room_id),
    }

    state.send_to_client(client_id, ServerMessage::FullState { state: snapshot });
    state.send_to_client(client_id, ServerMessage::PlayingAs { seat });
    if seat_taken {
        state.send_to_clients(&others, ServerMessage::StateUpdate { update });
        state.broadcast_game_list();
    }
}

/// Take a client out of their room, if they are in one.
fn leave_game(client_id: ClientId, state: &ServerState) {
    let Some((_, room_id)) = state.client_rooms.remove(&client_id) else {
        return;
    };
    let Some(mut room) = state.rooms.get_mut(&room_id) else {
        return;
    };
    let seat = room.leave(client_id);
    let update = room.game.players_update();
    let others = room.others(client_id);
    drop(room);

    if let Some(seat) = seat {
        info!("Client {} left seat {} in room {}", client_id, seat, room_id);
        state.send_to_clients(&others, ServerMessage::StateUpdate { update });
        state.broadcast_game_list();
    }
}

/// Apply a client's action and relay it, or resync the client on rejection.
fn relay_action(
    client_id: ClientId,
    action: Action,
    state: &ServerState,
) -> Result<(), RoomError> {
    let room_id = match state.client_rooms.get(&client_id) {
        Some(room_id) => *room_id,
        None => {
            state.send_to_client(
                client_id,
                ServerMessage::Error {
                    message: RoomError::NotInRoom.to_string(),
                },
            );
            return Err(RoomError::NotInRoom);
        }
    };

    let Some(mut room) = state.rooms.get_mut(&room_id) else {
        state.client_rooms.remove(&client_id);
        state.send_to_client(client_id, ServerMessage::Kick);
        return Err(RoomError::RoomNotFound(room_id));
    };

    match room.apply_action(client_id, &action) {
        Ok(events) => {
            let others = room.others(client_id);
            drop(room);

            debug!(room_id, ?events, "Applied action from {}", client_id);
            state.send_to_clients(&others, ServerMessage::Action { action });
            Ok(())
        }
        Err(e) => {
            let snapshot = room.snapshot();
            drop(room);

            // The client's view has diverged; push the authoritative state
            state.send_to_client(client_id, ServerMessage::FullState { state: snapshot });
            Err(e)
        }
    }
}

/// Handle client disconnect.
fn handle_disconnect(client_id: ClientId, state: &ServerState) {
    leave_game(client_id, state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactics_core::{Direction, Seat};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn test_config() -> GameConfig {
        GameConfig {
            seed: Some(9),
            wall_chance: 0.0,
            ..GameConfig::default()
        }
    }

    fn connect(state: &ServerState) -> (ClientId, UnboundedReceiver<ServerMessage>) {
        let client_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        state.client_senders.insert(client_id, tx);
        (client_id, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut msgs = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            msgs.push(msg);
        }
        msgs
    }

    fn open_move(state: &ServerState, room_id: RoomId, seat: Seat) -> Action {
        let room = state.rooms.get(&room_id).unwrap();
        let unit = room.game.units_for(seat).next().unwrap().pos;
        Direction::ALL
            .into_iter()
            .map(|dir| Action::Move { unit, dir })
            .find(|action| room.game.valid_action(seat, action))
            .unwrap()
    }

    #[test]
    fn test_add_game_assigns_increasing_ids() {
        let state = ServerState::new();
        assert_eq!(state.add_game(&test_config()).unwrap(), 0);
        assert_eq!(state.add_game(&test_config()).unwrap(), 1);
        assert_eq!(state.game_list().len(), 2);

        let bad = GameConfig {
            seats: 0,
            ..test_config()
        };
        assert!(state.add_game(&bad).is_err());
        assert_eq!(state.rooms.len(), 2);
    }

    #[test]
    fn test_join_seats_and_notifies() {
        let state = ServerState::new();
        let room_id = state.add_game(&test_config()).unwrap();
        let (a, mut rx_a) = connect(&state);
        let (b, mut rx_b) = connect(&state);

        handle_message(a, ClientMessage::JoinGame { room_id }, &state);
        let msgs = drain(&mut rx_a);
        assert!(matches!(msgs[0], ServerMessage::FullState { .. }));
        assert_eq!(msgs[1], ServerMessage::PlayingAs { seat: Some(0) });
        // b is still in the lobby and hears about the new seat count
        match drain(&mut rx_b).as_slice() {
            [ServerMessage::GameList { games }] => assert_eq!(games[&room_id].seated, 1),
            other => panic!("unexpected {:?}", other),
        }

        handle_message(b, ClientMessage::JoinGame { room_id }, &state);
        let msgs = drain(&mut rx_b);
        assert_eq!(msgs[1], ServerMessage::PlayingAs { seat: Some(1) });
        match drain(&mut rx_a).as_slice() {
            [ServerMessage::StateUpdate { update }] => {
                assert_eq!(update.players, Some(vec![Some(a), Some(b)]));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(*state.client_rooms.get(&b).unwrap(), room_id);
    }

    #[test]
    fn test_full_room_spectates() {
        let state = ServerState::new();
        let room_id = state.add_game(&test_config()).unwrap();
        let mut receivers = Vec::new();
        for _ in 0..3 {
            let (id, rx) = connect(&state);
            handle_message(id, ClientMessage::JoinGame { room_id }, &state);
            receivers.push((id, rx));
        }

        let (c, rx_c) = &mut receivers[2];
        let msgs = drain(rx_c);
        assert!(msgs.contains(&ServerMessage::PlayingAs { seat: None }));

        // Spectator actions are answered with a resync
        handle_message(*c, ClientMessage::Action { action: Action::EndTurn }, &state);
        assert!(matches!(drain(rx_c).as_slice(), [ServerMessage::FullState { .. }]));
    }

    #[test]
    fn test_missing_room_kicks() {
        let state = ServerState::new();
        let (a, mut rx) = connect(&state);

        handle_message(a, ClientMessage::JoinGame { room_id: 42 }, &state);
        let msgs = drain(&mut rx);
        assert_eq!(msgs[0], ServerMessage::Kick);
        assert!(matches!(msgs[1], ServerMessage::GameList { .. }));
        assert!(!state.client_rooms.contains_key(&a));
    }

    #[test]
    fn test_valid_action_is_relayed_to_others_only() {
        let state = ServerState::new();
        let room_id = state.add_game(&test_config()).unwrap();
        let (a, mut rx_a) = connect(&state);
        let (b, mut rx_b) = connect(&state);
        let (c, mut rx_c) = connect(&state);
        for id in [a, b, c] {
            handle_message(id, ClientMessage::JoinGame { room_id }, &state);
        }
        drain(&mut rx_a);
        drain(&mut rx_b);
        drain(&mut rx_c);

        let action = open_move(&state, room_id, 0);
        handle_message(a, ClientMessage::Action { action }, &state);

        assert!(drain(&mut rx_a).is_empty());
        assert_eq!(drain(&mut rx_b), vec![ServerMessage::Action { action }]);
        assert_eq!(drain(&mut rx_c), vec![ServerMessage::Action { action }]);
    }

    #[test]
    fn test_invalid_action_resyncs_sender() {
        let state = ServerState::new();
        let room_id = state.add_game(&test_config()).unwrap();
        let (a, mut rx_a) = connect(&state);
        let (b, mut rx_b) = connect(&state);
        handle_message(a, ClientMessage::JoinGame { room_id }, &state);
        handle_message(b, ClientMessage::JoinGame { room_id }, &state);
        drain(&mut rx_a);
        drain(&mut rx_b);

        let before = state.rooms.get(&room_id).unwrap().snapshot();

        // Not b's turn
        let unit = {
            let room = state.rooms.get(&room_id).unwrap();
            let pos = room.game.units_for(1).next().unwrap().pos;
            pos
        };
        let action = Action::Move {
            unit,
            dir: Direction::East,
        };
        handle_message(b, ClientMessage::Action { action }, &state);

        assert_eq!(
            drain(&mut rx_b),
            vec![ServerMessage::FullState {
                state: before.clone()
            }]
        );
        assert!(drain(&mut rx_a).is_empty());
        assert_eq!(state.rooms.get(&room_id).unwrap().snapshot(), before);
    }

    #[test]
    fn test_action_outside_room_is_an_error() {
        let state = ServerState::new();
        let (a, mut rx) = connect(&state);
        handle_message(a, ClientMessage::Action { action: Action::EndTurn }, &state);
        assert!(matches!(drain(&mut rx).as_slice(), [ServerMessage::Error { .. }]));
    }

    #[test]
    fn test_leave_frees_seat_and_returns_to_lobby() {
        let state = ServerState::new();
        let room_id = state.add_game(&test_config()).unwrap();
        let (a, mut rx_a) = connect(&state);
        let (b, mut rx_b) = connect(&state);
        handle_message(a, ClientMessage::JoinGame { room_id }, &state);
        handle_message(b, ClientMessage::JoinGame { room_id }, &state);
        drain(&mut rx_a);
        drain(&mut rx_b);

        handle_message(a, ClientMessage::LeaveGame, &state);

        match drain(&mut rx_b).as_slice() {
            [ServerMessage::StateUpdate { update }] => {
                assert_eq!(update.players, Some(vec![None, Some(b)]));
            }
            other => panic!("unexpected {:?}", other),
        }
        // a gets the lobby broadcast and the explicit reply
        let msgs = drain(&mut rx_a);
        assert!(msgs
            .iter()
            .all(|m| matches!(m, ServerMessage::GameList { .. })));
        assert!(!msgs.is_empty());
        assert!(!state.client_rooms.contains_key(&a));

        // A newcomer takes the freed seat
        let (c, mut rx_c) = connect(&state);
        handle_message(c, ClientMessage::JoinGame { room_id }, &state);
        assert!(drain(&mut rx_c).contains(&ServerMessage::PlayingAs { seat: Some(0) }));
    }

    #[test]
    fn test_joining_another_room_leaves_the_first() {
        let state = ServerState::new();
        let first = state.add_game(&test_config()).unwrap();
        let second = state.add_game(&test_config()).unwrap();
        let (a, _rx) = connect(&state);

        handle_message(a, ClientMessage::JoinGame { room_id: first }, &state);
        handle_message(a, ClientMessage::JoinGame { room_id: second }, &state);

        assert_eq!(state.rooms.get(&first).unwrap().summary().seated, 0);
        assert_eq!(state.rooms.get(&second).unwrap().summary().seated, 1);
        assert_eq!(*state.client_rooms.get(&a).unwrap(), second);
    }

    #[test]
    fn test_rejoining_same_room_keeps_seat() {
        let state = ServerState::new();
        let room_id = state.add_game(&test_config()).unwrap();
        let (a, mut rx) = connect(&state);
        let (b, _rx_b) = connect(&state);
        handle_message(a, ClientMessage::JoinGame { room_id }, &state);
        handle_message(b, ClientMessage::JoinGame { room_id }, &state);
        drain(&mut rx);

        handle_message(b, ClientMessage::JoinGame { room_id }, &state);
        {
            let room = state.rooms.get(&room_id).unwrap();
            assert_eq!(room.seat_of(a), Some(0));
            assert_eq!(room.seat_of(b), Some(1));
        }
        // Nothing changed, so nobody else is told
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_spectator_rejoining_takes_freed_seat() {
        let state = ServerState::new();
        let room_id = state.add_game(&test_config()).unwrap();
        let (a, _rx_a) = connect(&state);
        let (b, mut rx_b) = connect(&state);
        let (c, mut rx_c) = connect(&state);
        for id in [a, b, c] {
            handle_message(id, ClientMessage::JoinGame { room_id }, &state);
        }
        handle_message(a, ClientMessage::LeaveGame, &state);
        let (_lobby, mut rx_lobby) = connect(&state);
        drain(&mut rx_b);
        drain(&mut rx_c);

        handle_message(c, ClientMessage::JoinGame { room_id }, &state);

        assert!(drain(&mut rx_c).contains(&ServerMessage::PlayingAs { seat: Some(0) }));
        match drain(&mut rx_b).as_slice() {
            [ServerMessage::StateUpdate { update }] => {
                assert_eq!(update.players, Some(vec![Some(c), Some(b)]));
            }
            other => panic!("unexpected {:?}", other),
        }
        match drain(&mut rx_lobby).as_slice() {
            [ServerMessage::GameList { games }] => assert_eq!(games[&room_id].seated, 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_registers_and_cleans_up() {
        let state = Arc::new(ServerState::new());
        state.add_game(&test_config()).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server_state = Arc::clone(&state);
        let server = tokio::spawn(async move {
            let (stream, peer) = listener.accept().await.unwrap();
            handle_connection(stream, peer, server_state).await
        });

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}", addr))
            .await
            .unwrap();
        let first = ws.next().await.unwrap().unwrap();
        let welcome: ServerMessage = serde_json::from_str(first.to_text().unwrap()).unwrap();
        let ServerMessage::Welcome { client_id } = welcome.clone() else {
            panic!("expected welcome, got {:?}", welcome);
        };
        let second = ws.next().await.unwrap().unwrap();
        let list: ServerMessage = serde_json::from_str(second.to_text().unwrap()).unwrap();
        assert!(matches!(list, ServerMessage::GameList { .. }));
        assert!(state.client_senders.contains_key(&client_id));

        ws.close(None).await.unwrap();
        drop(ws);
        server.await.unwrap().unwrap();
        assert!(state.client_senders.is_empty());
        assert!(state.client_rooms.is_empty());
    }

    #[test]
    fn test_disconnect_frees_seat() {
        let state = ServerState::new();
        let room_id = state.add_game(&test_config()).unwrap();
        let (a, _rx) = connect(&state);
        handle_message(a, ClientMessage::JoinGame { room_id }, &state);

        handle_disconnect(a, &state);
        assert_eq!(state.rooms.get(&room_id).unwrap().summary().seated, 0);
        assert!(!state.client_rooms.contains_key(&a));
    }

    #[test]
    fn test_create_and_list_games() {
        let state = ServerState::new();
        let (a, mut rx) = connect(&state);

        handle_message(
            a,
            ClientMessage::CreateGame {
                config: GameConfig {
                    seats: 3,
                    ..test_config()
                },
            },
            &state,
        );
        match drain(&mut rx).as_slice() {
            [ServerMessage::GameList { games }] => assert_eq!(games[&0].capacity, 3),
            other => panic!("unexpected {:?}", other),
        }

        handle_message(
            a,
            ClientMessage::CreateGame {
                config: GameConfig {
                    rows: 0,
                    ..test_config()
                },
            },
            &state,
        );
        assert!(matches!(drain(&mut rx).as_slice(), [ServerMessage::Error { .. }]));

        handle_message(a, ClientMessage::ListGames, &state);
        assert!(matches!(drain(&mut rx).as_slice(), [ServerMessage::GameList { .. }]));

        handle_message(a, ClientMessage::Ping, &state);
        assert_eq!(drain(&mut rx), vec![ServerMessage::Pong]);
    }
}
