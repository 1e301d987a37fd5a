//! End-to-end tests: real `AuthorityClient`s against a real authority on
//! an ephemeral port.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use xt3_client::{AuthorityClient, ClientCommand, ClientConfig, ClientError, Event};
use xt3_core::Seat;
use xt3d::config::AuthorityConfig;
use xt3d::game::spawn_game;
use xt3d::server::AuthorityServer;

/// Maximum time to wait for any single event
const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// Test Helpers
// ============================================================================

async fn spawn_authority(cancel_token: CancellationToken) -> SocketAddr {
    let config = AuthorityConfig {
        listen: SocketAddr::from(([127, 0, 0, 1], 0)),
        prune_interval_secs: 1,
        ..AuthorityConfig::default()
    };

    let game = spawn_game(config.prune_interval());
    let server = AuthorityServer::bind(&config, game, cancel_token)
        .await
        .expect("bind ephemeral port");
    let addr = server.local_addr().expect("local addr");

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    addr
}

struct Player {
    events: mpsc::UnboundedReceiver<Event>,
    commands: mpsc::UnboundedSender<ClientCommand>,
    task: JoinHandle<Result<(), ClientError>>,
}

impl Player {
    fn start(addr: SocketAddr, name: &str, cancel_token: &CancellationToken) -> Self {
        let (event_tx, events) = mpsc::unbounded_channel();
        let (commands, command_rx) = mpsc::unbounded_channel();
        let config = ClientConfig {
            retry_initial_delay: Duration::from_millis(20),
            ..ClientConfig::new(addr.to_string(), name)
        };

        let client = AuthorityClient::new(config, event_tx, command_rx, cancel_token.child_token());
        let task = tokio::spawn(async move { client.run().await });

        Self {
            events,
            commands,
            task,
        }
    }

    /// Starts a player and waits until it holds a seat.
    async fn join(addr: SocketAddr, name: &str, cancel_token: &CancellationToken) -> (Self, Seat) {
        let mut player = Self::start(addr, name, cancel_token);
        let seat = match player
            .wait_for(|e| matches!(e, Event::Registered { .. }))
            .await
        {
            Event::Registered { seat, .. } => seat,
            other => panic!("Expected Registered, got {other:?}"),
        };
        (player, seat)
    }

    fn send(&self, command: ClientCommand) {
        self.commands.send(command).expect("client running");
    }

    /// Skips events until one matches.
    async fn wait_for(&mut self, matches: impl Fn(&Event) -> bool) -> Event {
        loop {
            let event = timeout(EVENT_TIMEOUT, self.events.recv())
                .await
                .expect("event within timeout")
                .expect("event channel open");
            if matches(&event) {
                return event;
            }
        }
    }

    /// Waits until the board shows `mark` on `cell`.
    async fn wait_for_mark(&mut self, cell: usize, mark: char) {
        self.wait_for(|e| matches!(e, Event::Board(cells) if cells[cell] == mark))
            .await;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_two_players_finish_a_game() {
    let cancel_token = CancellationToken::new();
    let addr = spawn_authority(cancel_token.clone()).await;

    let (mut alice, alice_seat) = Player::join(addr, "Alice", &cancel_token).await;
    let (mut bob, bob_seat) = Player::join(addr, "Bob", &cancel_token).await;
    assert_eq!(alice_seat, Seat::First);
    assert_eq!(bob_seat, Seat::Second);

    alice
        .wait_for(|e| *e == Event::Roster(vec!["Alice".into(), "Bob".into()]))
        .await;

    for (cell_x, cell_o) in [(0, 3), (1, 4)] {
        alice.send(ClientCommand::Move(cell_x));
        bob.wait_for_mark(cell_x, 'X').await;
        bob.send(ClientCommand::Move(cell_o));
        alice.wait_for_mark(cell_o, 'O').await;
    }
    alice.send(ClientCommand::Move(2));

    for player in [&mut alice, &mut bob] {
        assert_eq!(
            player.wait_for(|e| matches!(e, Event::GameOver(_))).await,
            Event::GameOver("Game Over! X is the winner.".into())
        );
        // Both clients acknowledge on their own, which re-enables New Game.
        player.wait_for(|e| *e == Event::ControlsHint(true)).await;
    }

    bob.send(ClientCommand::NewGame);
    alice
        .wait_for(|e| *e == Event::Board([' '; 9]))
        .await;

    cancel_token.cancel();
}

#[tokio::test]
async fn test_rejected_move_reaches_player() {
    let cancel_token = CancellationToken::new();
    let addr = spawn_authority(cancel_token.clone()).await;

    let (_alice, _) = Player::join(addr, "Alice", &cancel_token).await;
    let (mut bob, _) = Player::join(addr, "Bob", &cancel_token).await;

    bob.send(ClientCommand::Move(4));

    assert!(matches!(
        bob.wait_for(|e| matches!(e, Event::MoveRejected(_))).await,
        Event::MoveRejected(xt3_core::MoveError::NotYourTurn {
            expected: Seat::First
        })
    ));

    cancel_token.cancel();
}

#[tokio::test]
async fn test_third_player_gets_session_full() {
    let cancel_token = CancellationToken::new();
    let addr = spawn_authority(cancel_token.clone()).await;

    let (_alice, _) = Player::join(addr, "Alice", &cancel_token).await;
    let (_bob, _) = Player::join(addr, "Bob", &cancel_token).await;

    let mut carl = Player::start(addr, "Carl", &cancel_token);
    carl.wait_for(|e| *e == Event::SessionFull).await;

    let result = timeout(EVENT_TIMEOUT, carl.task)
        .await
        .expect("client stops")
        .expect("no panic");
    assert!(matches!(result, Err(ClientError::SessionFull)));

    cancel_token.cancel();
}

#[tokio::test]
async fn test_leave_frees_the_seat() {
    let cancel_token = CancellationToken::new();
    let addr = spawn_authority(cancel_token.clone()).await;

    let (alice, _) = Player::join(addr, "Alice", &cancel_token).await;
    let (mut bob, _) = Player::join(addr, "Bob", &cancel_token).await;

    alice.send(ClientCommand::Leave);
    let result = timeout(EVENT_TIMEOUT, alice.task)
        .await
        .expect("client stops")
        .expect("no panic");
    assert!(result.is_ok());

    bob.wait_for(|e| *e == Event::Roster(vec!["Bob".into()]))
        .await;

    let (_carl, carl_seat) = Player::join(addr, "Carl", &cancel_token).await;
    assert_eq!(carl_seat, Seat::First);

    cancel_token.cancel();
}

#[tokio::test]
async fn test_client_waits_for_authority_to_appear() {
    let cancel_token = CancellationToken::new();

    // Reserve a port, then free it so the first attempts fail.
    let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = probe.local_addr().unwrap();
    drop(probe);

    let mut alice = Player::start(addr, "Alice", &cancel_token);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let config = AuthorityConfig {
        listen: addr,
        ..AuthorityConfig::default()
    };
    let game = spawn_game(config.prune_interval());
    let server = AuthorityServer::bind(&config, game, cancel_token.clone())
        .await
        .expect("bind reserved port");
    tokio::spawn(async move {
        let _ = server.run().await;
    });

    assert_eq!(
        alice
            .wait_for(|e| matches!(e, Event::Registered { .. }))
            .await,
        Event::Registered {
            seat: Seat::First,
            mark: 'X'
        }
    );

    cancel_token.cancel();
}
