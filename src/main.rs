// ============================================================================
// LazyRates - Convertisseur de devises en terminal
// ============================================================================
// Liste de devises choisies par l'utilisateur ; saisir un montant dans
// l'une d'elles met à jour toutes les autres. Les taux viennent d'un flux
// public et sont gardés en cache sur disque.
//
// CONCEPTS RUST CLÉS :
// 1. Terminal raw mode : contrôle total du terminal
// 2. Event loop : boucle qui gère événements et rendering
// 3. Async dans sync : tokio::runtime::Runtime pour les requêtes HTTP
// 4. Channels : worker thread + abonnement au modèle
// ============================================================================

use std::io;
use std::sync::{mpsc, Arc, Mutex};

use anyhow::{Context, Result};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{debug, error, info, warn};

use lazyrates::api::{HttpRateFeed, RateService};
use lazyrates::app::{App, Screen, StatusLine};
use lazyrates::config::Config;
use lazyrates::models::canonical_code;
use lazyrates::store::{lock_model, ConversionModel, JsonFileStorage, SharedModel};
use lazyrates::ui::{events::EventHandler, render};

type Service = RateService<HttpRateFeed>;

// ============================================================================
// AppCommand : Commandes pour le worker thread
// ============================================================================

/// Commandes envoyées au worker thread pour exécuter des tâches async
#[derive(Debug, Clone)]
enum AppCommand {
    /// Rafraîchissement manuel des taux (ignore la fraîcheur du cache)
    RefreshRates,

    /// Chargement de la liste des devises disponibles
    LoadCatalog,
}

/// Résultats renvoyés par le worker thread
#[derive(Debug)]
enum AppResult {
    RatesRefreshed { count: usize },

    RefreshFailed { error: String },

    CatalogLoaded { currencies: Vec<String> },
}

// ============================================================================
// Logging
// ============================================================================

/// Initialise le système de logging vers fichier
///
/// Les logs sont écrits dans ./logs/lazyrates.log (rotation quotidienne).
///
/// # Utilisation
/// ```bash
/// tail -f logs/lazyrates.log
/// RUST_LOG=lazyrates=trace cargo run
/// ```
fn init_logging() -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = std::path::PathBuf::from("./logs");

    std::fs::create_dir_all(&log_dir).context("Échec de la création du répertoire de logs")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir.clone(), "lazyrates.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false) // Pas de codes couleur dans le fichier
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .with(
            // Par défaut : debug pour lazyrates, info pour les dépendances
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lazyrates=debug,info".into()),
        )
        .init();

    info!(?log_dir, "Logging initialisé");
    Ok(())
}

// ============================================================================
// Point d'entrée du programme
// ============================================================================

fn main() -> Result<()> {
    init_logging().unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {}", e);
        eprintln!("   Continuing without logging...");
    });

    info!("LazyRates starting up");

    let config = Config::load_or_default();
    info!(
        feed = %config.feed_url,
        base = %config.base_currency,
        state = %config.state_path().display(),
        "Configuration loaded"
    );

    // Le modèle est partagé entre l'UI et le worker
    let model: SharedModel =
        ConversionModel::load(Box::new(JsonFileStorage::new(config.state_path())))
            .with_base_currency(&config.base_currency)
            .into_shared();

    let feed = HttpRateFeed::new(&config.feed_url, config.request_timeout())?;
    let service = Arc::new(RateService::new(feed, model.clone()));

    // Premier chargement des taux (cache frais, requête, ou repli)
    println!("📊 Chargement des taux...");
    let runtime = tokio::runtime::Runtime::new()?;
    match runtime.block_on(service.initialize()) {
        Ok(rates) => info!(rates = rates.len(), "Rates ready"),
        Err(e) => {
            error!(error = ?e, "No exchange rates available");
            eprintln!("⚠️  {:#}", e);
        }
    }

    // Abonnement au modèle
    // CONCEPT : le callback tourne sous le verrou du modèle ;
    // il se contente d'envoyer un résumé à l'event loop
    let (status_tx, status_rx) = mpsc::channel::<StatusLine>();
    let subscription = lock_model(&model).subscribe(move |state| {
        let _ = status_tx.send(StatusLine::from(state));
    });

    let initial_status = StatusLine::from(lock_model(&model).state());
    let app = Arc::new(Mutex::new(App::with_status(initial_status)));

    let (command_tx, command_rx) = mpsc::channel::<AppCommand>();
    let (result_tx, result_rx) = mpsc::channel::<AppResult>();

    info!("Spawning background worker thread");
    spawn_background_worker(runtime, service.clone(), command_rx, result_tx);

    let _ = command_tx.send(AppCommand::LoadCatalog);

    debug!("Setting up terminal");
    let mut terminal = setup_terminal()?;

    let events = EventHandler::new();

    info!("Starting event loop");
    let channels = Channels {
        command_tx,
        result_rx,
        status_rx,
    };
    let result = run(&mut terminal, app, &service, &events, channels);

    // Restaure le terminal (même en cas d'erreur)
    debug!("Restoring terminal");
    restore_terminal(&mut terminal)?;

    subscription.unsubscribe();

    match &result {
        Ok(_) => info!("Application exited normally"),
        Err(e) => error!(error = ?e, "Application exited with error"),
    }

    result
}

// ============================================================================
// Worker thread
// ============================================================================

/// Lance le worker qui exécute les requêtes HTTP
///
/// Le runtime tokio est déplacé dans le thread ; la boucle se termine
/// quand l'event loop lâche son Sender.
fn spawn_background_worker(
    runtime: tokio::runtime::Runtime,
    service: Arc<Service>,
    command_rx: mpsc::Receiver<AppCommand>,
    result_tx: mpsc::Sender<AppResult>,
) {
    std::thread::spawn(move || {
        info!("Background worker started");

        for command in command_rx {
            debug!(?command, "Worker received command");

            let result = match command {
                AppCommand::RefreshRates => match runtime.block_on(service.refresh_rates()) {
                    Ok(rates) => AppResult::RatesRefreshed { count: rates.len() },
                    Err(e) => {
                        warn!(error = ?e, "Manual refresh failed");
                        AppResult::RefreshFailed {
                            error: format!("{:#}", e),
                        }
                    }
                },
                AppCommand::LoadCatalog => AppResult::CatalogLoaded {
                    currencies: runtime.block_on(service.available_currencies()),
                },
            };

            if result_tx.send(result).is_err() {
                break;
            }
        }

        info!("Background worker stopped");
    });
}

// ============================================================================
// Event loop
// ============================================================================

struct Channels {
    command_tx: mpsc::Sender<AppCommand>,
    result_rx: mpsc::Receiver<AppResult>,
    status_rx: mpsc::Receiver<StatusLine>,
}

/// Exécute la boucle principale de l'application
///
/// Ordre de verrouillage : App puis modèle, jamais l'inverse.
fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: Arc<Mutex<App>>,
    service: &Service,
    events: &EventHandler,
    channels: Channels,
) -> Result<()> {
    loop {
        let mut app_lock = app.lock().unwrap_or_else(|e| e.into_inner());
        if !app_lock.is_running() {
            break;
        }

        // 0. STATUT : dernier état publié par le modèle
        while let Ok(status) = channels.status_rx.try_recv() {
            app_lock.apply_status(status);
        }

        // 1. RÉSULTATS du worker
        match channels.result_rx.try_recv() {
            Ok(AppResult::RatesRefreshed { count }) => {
                info!(rates = count, "Rates refreshed");
                app_lock.set_flash(format!("Taux mis à jour ({} devises)", count));
            }
            Ok(AppResult::RefreshFailed { error }) => {
                error!(error = %error, "Failed to refresh rates");
                app_lock.set_flash(error);
            }
            Ok(AppResult::CatalogLoaded { currencies }) => {
                info!(currencies = currencies.len(), "Currency catalog loaded");
                app_lock.available_currencies = currencies;
            }
            Err(mpsc::TryRecvError::Empty) => {}
            Err(mpsc::TryRecvError::Disconnected) => {
                error!("Worker thread disconnected!");
            }
        }

        // 2. RENDER
        terminal.draw(|frame| {
            let model = lock_model(service.model());
            render(frame, &app_lock, &model);
        })?;

        // Le verrou est relâché pendant l'attente d'un événement
        drop(app_lock);

        // 3. INPUT
        if let Ok(event) = events.next() {
            let mut app_lock = app.lock().unwrap_or_else(|e| e.into_inner());
            handle_event(&mut app_lock, event, service, &channels.command_tx);
        }
    }

    Ok(())
}

// ============================================================================
// Gestion des événements
// ============================================================================

/// Code de la devise sélectionnée dans la liste
fn selected_code(app: &App, service: &Service) -> Option<String> {
    lock_model(service.model())
        .user_currencies()
        .get(app.selected_index)
        .cloned()
}

/// Ajoute une devise via le service et sélectionne-la
fn add_currency(app: &mut App, service: &Service, code: &str) {
    if lock_model(service.model()).user_currencies().iter().any(|c| c == code) {
        app.set_flash(format!("{} est déjà dans la liste", code));
        return;
    }

    if service.add_supported_currency(code) {
        info!(currency = %code, "User added currency");
        app.selected_index = lock_model(service.model()).user_currencies().len().saturating_sub(1);
        app.set_flash(format!("{} ajoutée", code));
    } else {
        app.set_flash(format!("Devise non supportée : {}", code));
    }
}

/// Traite un événement et met à jour l'état de l'application
fn handle_event(
    app: &mut App,
    event: lazyrates::ui::events::Event,
    service: &Service,
    command_tx: &mpsc::Sender<AppCommand>,
) {
    use lazyrates::ui::events::{
        get_char_from_event, is_add_event, is_add_suggested_event, is_amount_char_event,
        is_backspace_event, is_code_char_event, is_defaults_event, is_delete_event,
        is_down_event, is_enter_event, is_escape_event, is_move_down_event, is_move_up_event,
        is_quit_event, is_refresh_event, is_up_event, Event,
    };

    match event {
        // ========================================
        // Mode saisie (prioritaire : 'q', 'a'... sont des caractères)
        // ========================================
        Event::Key(_) if is_escape_event(&event) && app.is_in_input_mode() => {
            debug!("User cancelled input");
            app.cancel_input();
        }

        Event::Key(_) if is_enter_event(&event) && app.is_in_input_mode() => {
            let screen = app.current_screen;
            let value = app.submit_input();

            match screen {
                Screen::EditAmount => {
                    let mut model = lock_model(service.model());
                    model.set_active_amount(value.as_str());
                    info!(
                        currency = %model.active_currency(),
                        amount = model.active_amount(),
                        "User set amount"
                    );
                }
                Screen::AddCurrency => {
                    let code = canonical_code(&value);
                    if code.is_empty() {
                        debug!("Empty currency code, ignoring");
                    } else {
                        add_currency(app, service, &code);
                    }
                }
                Screen::Dashboard => {}
            }
        }

        Event::Key(_) if is_backspace_event(&event) && app.is_in_input_mode() => {
            app.backspace();
        }

        Event::Key(_) if app.current_screen == Screen::EditAmount && is_amount_char_event(&event) => {
            if let Some(c) = get_char_from_event(&event) {
                app.append_char(c);
            }
        }

        Event::Key(_) if app.current_screen == Screen::AddCurrency && is_code_char_event(&event) => {
            if let Some(c) = get_char_from_event(&event) {
                app.append_char(c.to_ascii_uppercase());
            }
        }

        Event::Key(_) if app.is_in_input_mode() => {
            // Caractère refusé dans ce mode
        }

        // ========================================
        // Dashboard
        // ========================================
        Event::Key(_) if is_quit_event(&event) => {
            if app.is_awaiting_quit_confirmation() {
                info!("User confirmed quit");
                app.quit();
            } else {
                info!("User requested quit (awaiting confirmation)");
                app.request_quit();
            }
        }

        Event::Key(_) if is_delete_event(&event) => {
            app.cancel_quit();
            if let Some(code) = selected_code(app, service) {
                if app.is_awaiting_delete_confirmation() {
                    info!(currency = %code, "User confirmed delete");
                    let mut model = lock_model(service.model());
                    model.remove_currency(&code);
                    let len = model.user_currencies().len();
                    drop(model);
                    app.cancel_delete();
                    app.clamp_selection(len);
                } else {
                    info!("User requested delete (awaiting confirmation)");
                    app.request_delete();
                }
            }
        }

        Event::Key(_) if is_up_event(&event) => {
            app.cancel_confirmations();
            app.navigate_up();
        }

        Event::Key(_) if is_down_event(&event) => {
            app.cancel_confirmations();
            let len = lock_model(service.model()).user_currencies().len();
            app.navigate_down(len);
        }

        Event::Key(_) if is_move_up_event(&event) => {
            app.cancel_confirmations();
            if app.selected_index > 0 {
                let from = app.selected_index;
                lock_model(service.model()).reorder_currencies(from, from - 1);
                app.selected_index = from - 1;
            }
        }

        Event::Key(_) if is_move_down_event(&event) => {
            app.cancel_confirmations();
            let from = app.selected_index;
            let mut model = lock_model(service.model());
            if from + 1 < model.user_currencies().len() {
                model.reorder_currencies(from, from + 1);
                app.selected_index = from + 1;
            }
        }

        // Enter : la devise sélectionnée devient active, puis saisie du montant
        Event::Key(_) if is_enter_event(&event) => {
            app.cancel_confirmations();
            if let Some(code) = selected_code(app, service) {
                let mut model = lock_model(service.model());
                let amount = model.all_amounts().get(&code).copied().unwrap_or(0.0);
                model.set_active_currency_with_amount(&code, amount);
                drop(model);

                debug!(currency = %code, "User editing amount");
                app.start_input(
                    Screen::EditAmount,
                    format!("Montant en {} : ", code),
                    format!("{:.2}", amount),
                );
            }
        }

        Event::Key(_) if is_add_event(&event) => {
            app.cancel_confirmations();
            let prompt = if app.available_currencies.is_empty() {
                "Ajouter une devise : ".to_string()
            } else {
                format!("Ajouter une devise ({} disponibles) : ", app.available_currencies.len())
            };
            app.start_input(Screen::AddCurrency, prompt, String::new());
        }

        Event::Key(_) if is_add_suggested_event(&event) => {
            app.cancel_confirmations();
            let suggestion = lock_model(service.model()).next_suggested_currency();
            match suggestion {
                Some(code) => add_currency(app, service, code),
                None => app.set_flash("Toutes les devises principales sont déjà affichées"),
            }
        }

        Event::Key(_) if is_defaults_event(&event) => {
            app.cancel_confirmations();
            info!("User requested default currencies");
            lock_model(service.model()).setup_default_currencies();
        }

        Event::Key(_) if is_refresh_event(&event) => {
            app.cancel_confirmations();
            info!("User requested rates refresh");
            app.flash = None;
            let _ = command_tx.send(AppCommand::RefreshRates);
        }

        Event::Tick => {}

        Event::Key(_) => {
            // Toute autre touche : annule les confirmations si actives
            app.cancel_confirmations();
        }
    }
}

// ============================================================================
// Setup et restauration du terminal
// ============================================================================

/// Configure le terminal en mode TUI
fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| e.into())
}

/// Restaure le terminal à son état normal
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;

    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;

    terminal.show_cursor()?;

    Ok(())
}
