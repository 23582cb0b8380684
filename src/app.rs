use crate::commands::Command;
use crate::ui::{board, panels};
use chess_core::coordinator::{CoordinatorEvent, MoveCoordinator, TurnGate};
use chess_core::engine::config::EngineConfig;
use chess_core::engine::search::AlphaBetaEngine;
use chess_core::logic::clock::TurnClock;
use chess_core::logic::game::{GameSession, MoveOutcome};
use chess_core::logic::position::side_name;
use chess_core::persistence::queue::CoalescingQueue;
use chess_core::persistence::store::JsonSaveStore;
use chess_core::persistence::{GameSave, SaveStore};
use chess_core::settings::AppSettings;
use shakmaty::Square;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{self, AsyncBufReadExt, BufReader};

const TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Which save file the current game writes to.
#[derive(Debug, Clone)]
struct SaveSlot {
    id: String,
    name: String,
    file: Option<PathBuf>,
}

impl SaveSlot {
    fn fresh() -> Self {
        Self {
            id: GameSave::fresh_id(),
            name: format!("Auto Save {}", chrono::Local::now().format("%Y-%m-%d %H:%M")),
            file: None,
        }
    }
}

pub struct App {
    settings: AppSettings,
    settings_path: PathBuf,
    session: GameSession,
    coordinator: MoveCoordinator,
    store: JsonSaveStore,
    autosaves: CoalescingQueue<JsonSaveStore>,
    clock: TurnClock,
    paused: bool,
    slot: SaveSlot,
    listed: Vec<GameSave>,
    last_tick: Instant,
}

impl App {
    pub fn new(
        settings: AppSettings,
        settings_path: PathBuf,
        engine_config: EngineConfig,
    ) -> anyhow::Result<Self> {
        let engine = AlphaBetaEngine::new(Arc::new(engine_config));
        let coordinator = MoveCoordinator::new(engine, &settings)?;
        let store = JsonSaveStore::new(settings.save_dir.clone());
        let autosaves = CoalescingQueue::new(store.clone())?;

        Ok(Self {
            session: GameSession::new(settings.game_mode),
            clock: TurnClock::new(settings.time_control.seconds_per_turn()),
            settings,
            settings_path,
            coordinator,
            store,
            autosaves,
            paused: false,
            slot: SaveSlot::fresh(),
            listed: Vec::new(),
            last_tick: Instant::now(),
        })
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        println!("{}", panels::HELP);
        self.show_board(&[]);

        let mut lines = BufReader::new(io::stdin()).lines();
        let mut ticker = tokio::time::interval(TICK);

        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if self.handle_line(&line, Instant::now()) == Flow::Quit {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        tracing::error!("stdin closed: {err}");
                        break;
                    }
                },
                _ = ticker.tick() => self.tick(Instant::now()),
            }
        }

        self.shutdown();
        Ok(())
    }

    pub fn handle_line(&mut self, line: &str, now: Instant) -> Flow {
        if line.trim().is_empty() {
            return Flow::Continue;
        }
        match line.parse::<Command>() {
            Ok(command) => self.execute(command, now),
            Err(err) => {
                println!("{err}");
                Flow::Continue
            }
        }
    }

    fn execute(&mut self, command: Command, now: Instant) -> Flow {
        match command {
            Command::Move { from, to } => self.human_move(from, to, now),
            Command::Targets(square) => self.show_targets(square),
            Command::Board => self.show_board(&[]),
            Command::History => println!("{}", panels::history(self.session.move_history())),
            Command::New => self.new_game(now),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(now),
            Command::Save(name) => self.save_now(name),
            Command::Saves => self.list_saves(),
            Command::Load(n) => self.load(n, now),
            Command::Delete(n) => self.delete(n),
            Command::Mode(mode) => {
                self.settings.game_mode = mode;
                self.session.set_game_mode(mode);
                self.settings_changed();
                self.request_computer_move(now);
            }
            Command::Level(difficulty) => {
                self.settings.difficulty = difficulty;
                self.settings_changed();
            }
            Command::Clock(time_control) => {
                self.settings.time_control = time_control;
                self.clock = TurnClock::new(time_control.seconds_per_turn());
                self.settings_changed();
            }
            Command::Help => println!("{}", panels::HELP),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// Runs every tick: the clock, the computer and the save writer.
    pub fn tick(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;

        if !self.paused && !self.session.is_over() {
            if let Some(winner) = self.clock.tick(self.session.turn(), elapsed) {
                self.coordinator.cancel();
                println!("Time expired. Winner: {}", side_name(winner));
                tracing::info!("clock flagged, {} wins", side_name(winner));
            }
        }

        let gate = TurnGate {
            paused: self.paused,
            time_expired: self.clock.is_expired(),
        };
        if let Some(event) = self.coordinator.poll(&mut self.session, gate, now) {
            self.on_coordinator_event(event, now);
        }

        for report in self.autosaves.poll_reports() {
            match report {
                Ok(saved) if saved.id == self.slot.id => self.slot.file = saved.file,
                Ok(_) => {}
                Err(err) => println!("Auto-save failed: {err}"),
            }
        }
    }

    fn on_coordinator_event(&mut self, event: CoordinatorEvent, now: Instant) {
        match event {
            CoordinatorEvent::Applied { outcome, stats } => {
                tracing::debug!(
                    "computer move after {} nodes in {}ms",
                    stats.nodes,
                    stats.time_ms
                );
                self.after_move(&outcome, now);
            }
            CoordinatorEvent::NoMove => println!("The computer has no move to play."),
            CoordinatorEvent::SearchFailed(reason) => {
                println!("The computer could not find a move: {reason}");
            }
            CoordinatorEvent::Aborted => {}
            CoordinatorEvent::Rejected(err) => println!("The computer's move was refused: {err}"),
        }
    }

    fn human_move(&mut self, from: Square, to: Square, now: Instant) {
        if self.paused {
            println!("The game is paused. Type `resume` to continue.");
            return;
        }
        if self.clock.is_expired() {
            println!("Time has run out. Start a new game with `new`.");
            return;
        }
        if self.coordinator.is_thinking() || self.session.is_computers_turn() {
            println!("Wait for the computer to move.");
            return;
        }
        match self.session.apply_move(from, to) {
            Ok(outcome) => self.after_move(&outcome, now),
            Err(err) => println!("{err}"),
        }
    }

    fn after_move(&mut self, outcome: &MoveOutcome, now: Instant) {
        println!("{}", panels::outcome_line(outcome));
        self.clock.reset_for_turn(self.session.turn());
        self.show_board(&[outcome.from, outcome.to]);
        self.autosave();
        self.request_computer_move(now);
    }

    fn request_computer_move(&mut self, now: Instant) {
        if self.paused
            || self.clock.is_expired()
            || self.coordinator.is_thinking()
            || self.session.is_over()
            || !self.session.is_computers_turn()
        {
            return;
        }
        self.coordinator.configure(&self.settings);
        if let Err(err) = self.coordinator.request(&self.session, now) {
            tracing::warn!("could not start the computer move: {err}");
        }
    }

    fn show_targets(&mut self, square: Square) {
        let targets = self.session.legal_targets(square);
        if targets.is_empty() {
            println!("No legal moves from {square}.");
            return;
        }
        let mut marked = targets.clone();
        marked.push(square);
        self.show_board(&marked);
        let names: Vec<String> = targets.iter().map(ToString::to_string).collect();
        println!("{square}: {}", names.join(" "));
    }

    fn show_board(&self, marked: &[Square]) {
        println!("{}", board::render(&self.session, marked));
        println!("{}", panels::captures(&self.session));
        println!(
            "{}",
            panels::status_line(
                &self.session,
                &self.clock,
                self.paused,
                self.coordinator.is_thinking()
            )
        );
    }

    fn new_game(&mut self, now: Instant) {
        self.coordinator.cancel();
        self.session.reset();
        self.session.set_game_mode(self.settings.game_mode);
        self.clock.reset_for_new_game();
        self.paused = false;
        self.slot = SaveSlot::fresh();
        self.last_tick = now;
        println!("New game.");
        self.show_board(&[]);
    }

    fn pause(&mut self) {
        if self.paused {
            return;
        }
        self.paused = true;
        self.coordinator.cancel();
        println!("Paused.");
    }

    fn resume(&mut self, now: Instant) {
        if !self.paused {
            return;
        }
        self.paused = false;
        self.last_tick = now;
        println!("Resumed.");
        self.request_computer_move(now);
    }

    fn snapshot(&self) -> GameSave {
        let mut save = GameSave::snapshot(
            &self.session,
            &self.slot.id,
            &self.slot.name,
            self.settings.difficulty,
        );
        save.file.clone_from(&self.slot.file);
        save
    }

    fn autosave(&self) {
        if self.session.move_history().is_empty() {
            return;
        }
        self.autosaves.submit(self.snapshot());
    }

    fn save_now(&mut self, name: Option<String>) {
        if let Some(name) = name {
            self.slot.name = name;
        }
        match self.store.write(&self.snapshot()) {
            Ok(saved) => {
                println!("Saved \"{}\".", saved.name);
                self.slot.file = saved.file;
            }
            Err(err) => println!("Save failed: {err}"),
        }
    }

    fn list_saves(&mut self) {
        match self.store.list() {
            Ok(list) => {
                self.listed = list;
                println!("{}", panels::saves(&self.listed));
            }
            Err(err) => println!("Could not read saves: {err}"),
        }
    }

    fn listed_save(&self, n: usize) -> Option<GameSave> {
        let save = n.checked_sub(1).and_then(|index| self.listed.get(index)).cloned();
        if save.is_none() {
            println!("No save number {n}. Type `saves` to list them.");
        }
        save
    }

    fn load(&mut self, n: usize, now: Instant) {
        let Some(save) = self.listed_save(n) else {
            return;
        };
        self.coordinator.cancel();
        if let Err(err) = save.restore_into(&mut self.session) {
            println!("Could not load \"{}\": {err}", save.name);
            return;
        }

        self.settings.game_mode = save.mode;
        self.settings.difficulty = save.difficulty;
        self.slot = SaveSlot {
            id: save.id.clone(),
            name: save.name.clone(),
            file: save.file.clone(),
        };
        self.clock.reset_for_new_game();
        self.paused = false;
        self.last_tick = now;
        println!("Loaded \"{}\".", save.name);
        self.show_board(&[]);
        self.request_computer_move(now);
    }

    fn delete(&mut self, n: usize) {
        let Some(save) = self.listed_save(n) else {
            return;
        };
        match self.store.delete(&save) {
            Ok(true) => println!("Deleted \"{}\".", save.name),
            Ok(false) => println!("\"{}\" was already gone.", save.name),
            Err(err) => println!("Could not delete \"{}\": {err}", save.name),
        }
        self.list_saves();
    }

    fn settings_changed(&mut self) {
        self.coordinator.configure(&self.settings);
        if let Err(err) = self.settings.save(&self.settings_path) {
            tracing::warn!("settings not saved: {err}");
        }
        println!(
            "{} | {} | {}s per turn",
            self.settings.game_mode,
            self.settings.difficulty,
            self.settings.time_control.seconds_per_turn()
        );
    }

    /// Cancels the computer and writes the final auto-save before exit.
    fn shutdown(mut self) {
        self.coordinator.cancel();
        self.autosave();
        for report in self.autosaves.close() {
            if let Err(err) = report {
                tracing::error!("final save failed: {err}");
            }
        }
        tracing::info!("bye");
    }
}
