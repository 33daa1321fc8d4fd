// ============================================================================
// Structure : App
// ============================================================================
// État de l'interface TUI (sélection, écran, saisie, confirmations)
//
// Les données du convertisseur ne sont PAS ici : elles vivent dans le
// ConversionModel. App ne garde que ce qui concerne l'affichage, plus une
// copie du statut (chargement, erreur, date) reçue par abonnement.
//
// CONCEPTS RUST :
// 1. State Management : l'état de l'UI dans une seule structure
// 2. Mutabilité contrôlée : &mut self pour modifier l'état
// ============================================================================

use chrono::{DateTime, Utc};

use crate::store::ConversionState;

// ============================================================================
// Enum : Screen
// ============================================================================

/// Écrans de l'application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Vue principale : liste des devises et montants
    Dashboard,

    /// Saisie du montant de la devise sélectionnée
    EditAmount,

    /// Saisie du code d'une devise à ajouter
    AddCurrency,
}

/// Statut du modèle affiché dans l'en-tête
///
/// CONCEPT : copie légère envoyée par l'abonné du modèle
/// - l'abonné ne peut pas verrouiller App (il s'exécute sous le verrou
///   du modèle), il envoie donc ce résumé sur un channel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusLine {
    pub is_loading: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl From<&ConversionState> for StatusLine {
    fn from(state: &ConversionState) -> Self {
        Self {
            is_loading: state.is_loading,
            error: state.error.clone(),
            last_updated: state.last_updated,
        }
    }
}

/// État principal de l'interface
pub struct App {
    /// Indique si l'application doit continuer à tourner
    pub running: bool,

    /// Index de la devise sélectionnée
    pub selected_index: usize,

    /// Écran actuellement affiché
    pub current_screen: Screen,

    /// Two-step quit : première pression de 'q' = demande de confirmation
    pub confirm_quit: bool,

    /// Two-step delete : première pression de 'd' = demande de confirmation
    pub confirm_delete: bool,

    /// Buffer de saisie (montant ou code devise)
    pub input_buffer: String,

    /// Prompt affiché en mode saisie
    pub input_prompt: String,

    /// Dernier statut reçu du modèle
    pub status: StatusLine,

    /// Message ponctuel (ex: devise refusée, rafraîchissement terminé)
    pub flash: Option<String>,

    /// Devises proposées par le flux (chargées en arrière-plan)
    pub available_currencies: Vec<String>,
}

impl App {
    pub fn new() -> Self {
        Self {
            running: true,
            selected_index: 0,
            current_screen: Screen::Dashboard,
            confirm_quit: false,
            confirm_delete: false,
            input_buffer: String::new(),
            input_prompt: String::new(),
            status: StatusLine::default(),
            flash: None,
            available_currencies: Vec::new(),
        }
    }

    /// Crée une App avec le statut initial du modèle
    pub fn with_status(status: StatusLine) -> Self {
        Self {
            status,
            ..Self::new()
        }
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Navigue vers le haut (saturating_sub : jamais sous 0)
    pub fn navigate_up(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    /// Navigue vers le bas, limité à `len - 1`
    pub fn navigate_down(&mut self, len: usize) {
        let max_index = len.saturating_sub(1);
        self.selected_index = (self.selected_index + 1).min(max_index);
    }

    /// Ramène la sélection dans les bornes après une suppression
    pub fn clamp_selection(&mut self, len: usize) {
        self.selected_index = self.selected_index.min(len.saturating_sub(1));
    }

    pub fn is_on_dashboard(&self) -> bool {
        self.current_screen == Screen::Dashboard
    }

    // ========================================================================
    // Confirmations
    // ========================================================================

    pub fn request_quit(&mut self) {
        self.confirm_quit = true;
    }

    pub fn cancel_quit(&mut self) {
        self.confirm_quit = false;
    }

    pub fn is_awaiting_quit_confirmation(&self) -> bool {
        self.confirm_quit
    }

    pub fn request_delete(&mut self) {
        self.confirm_delete = true;
    }

    pub fn cancel_delete(&mut self) {
        self.confirm_delete = false;
    }

    pub fn is_awaiting_delete_confirmation(&self) -> bool {
        self.confirm_delete
    }

    /// Annule toutes les confirmations en attente
    pub fn cancel_confirmations(&mut self) {
        self.confirm_quit = false;
        self.confirm_delete = false;
    }

    // ========================================================================
    // Input Mode Management
    // ========================================================================

    /// Entre en mode saisie
    ///
    /// # Arguments
    /// * `screen` - EditAmount ou AddCurrency
    /// * `prompt` - Texte affiché avant la saisie
    /// * `initial` - Contenu initial du buffer
    pub fn start_input(&mut self, screen: Screen, prompt: String, initial: String) {
        self.current_screen = screen;
        self.input_prompt = prompt;
        self.input_buffer = initial;
        self.flash = None;
    }

    /// Annule la saisie et retourne au dashboard
    pub fn cancel_input(&mut self) {
        self.current_screen = Screen::Dashboard;
        self.input_buffer.clear();
        self.input_prompt.clear();
    }

    /// Récupère la valeur saisie et retourne au dashboard
    pub fn submit_input(&mut self) -> String {
        let value = std::mem::take(&mut self.input_buffer);
        self.current_screen = Screen::Dashboard;
        self.input_prompt.clear();
        value
    }

    pub fn append_char(&mut self, c: char) {
        self.input_buffer.push(c);
    }

    pub fn backspace(&mut self) {
        self.input_buffer.pop();
    }

    pub fn is_in_input_mode(&self) -> bool {
        self.current_screen != Screen::Dashboard
    }

    // ========================================================================
    // Statut
    // ========================================================================

    pub fn apply_status(&mut self, status: StatusLine) {
        self.status = status;
    }

    pub fn set_flash(&mut self, message: impl Into<String>) {
        self.flash = Some(message.into());
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_creation() {
        let app = App::new();
        assert!(app.is_running());
        assert!(app.is_on_dashboard());
        assert_eq!(app.selected_index, 0);
    }

    #[test]
    fn test_app_quit() {
        let mut app = App::new();
        app.quit();
        assert!(!app.is_running());
    }

    #[test]
    fn test_navigation() {
        let mut app = App::new();

        app.navigate_down(3);
        app.navigate_down(3);
        assert_eq!(app.selected_index, 2);

        // Au max : reste à 2
        app.navigate_down(3);
        assert_eq!(app.selected_index, 2);

        app.navigate_up();
        app.navigate_up();
        app.navigate_up();
        assert_eq!(app.selected_index, 0);

        // Liste vide
        app.navigate_down(0);
        assert_eq!(app.selected_index, 0);
    }

    #[test]
    fn test_clamp_selection() {
        let mut app = App::new();
        app.selected_index = 3;
        app.clamp_selection(3);
        assert_eq!(app.selected_index, 2);
        app.clamp_selection(0);
        assert_eq!(app.selected_index, 0);
    }

    #[test]
    fn test_input_mode() {
        let mut app = App::new();
        app.start_input(Screen::EditAmount, "Montant : ".to_string(), "10".to_string());
        assert!(app.is_in_input_mode());

        app.append_char('5');
        app.backspace();
        app.append_char('0');

        assert_eq!(app.submit_input(), "100");
        assert!(app.is_on_dashboard());
        assert!(app.input_buffer.is_empty());
    }

    #[test]
    fn test_cancel_confirmations() {
        let mut app = App::new();
        app.request_quit();
        app.request_delete();
        app.cancel_confirmations();
        assert!(!app.is_awaiting_quit_confirmation());
        assert!(!app.is_awaiting_delete_confirmation());
    }

    #[test]
    fn test_status_from_state() {
        let mut state = ConversionState::default();
        state.is_loading = true;
        state.error = Some("oops".to_string());

        let status = StatusLine::from(&state);
        assert!(status.is_loading);
        assert_eq!(status.error.as_deref(), Some("oops"));
        assert!(status.last_updated.is_none());
    }
}
