// ============================================================================
// Dashboard - Rendu de l'interface principale
// ============================================================================
// Dessine la liste des devises, chaque montant converti depuis la devise
// active, avec l'état des taux dans l'en-tête
//
// CONCEPTS RATATUI :
// 1. Frame : surface de dessin
// 2. Widgets : composants UI (Block, Paragraph, List)
// 3. Layout : découpage de l'espace en zones
// ============================================================================

use chrono::{DateTime, Local, Utc};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::app::{App, Screen};
use crate::models::{currency_flag, currency_name, search_currencies};
use crate::store::ConversionModel;

/// Nombre de suggestions affichées pendant la saisie d'un code
const SUGGESTIONS_SHOWN: usize = 8;

/// Dessine l'interface complète
///
/// # Arguments
/// * `frame` - Surface de dessin ratatui
/// * `app` - État de l'interface
/// * `model` - Modèle de conversion (lecture seule)
pub fn render(frame: &mut Frame, app: &App, model: &ConversionModel) {
    let chunks = create_layout(frame.size());

    render_header(frame, app, model, chunks[0]);
    render_main_content(frame, app, model, chunks[1]);

    match app.current_screen {
        Screen::Dashboard => render_footer(frame, app, model, chunks[2]),
        Screen::EditAmount | Screen::AddCurrency => render_input_footer(frame, app, model, chunks[2]),
    }
}

/// Crée le layout principal (header, content, footer)
fn create_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Liste des devises
            Constraint::Length(4), // Footer (2 lignes en mode saisie)
        ])
        .split(area)
        .to_vec()
}

// ============================================================================
// Header : statut des taux
// ============================================================================

fn render_header(frame: &mut Frame, app: &App, model: &ConversionModel, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" LazyRates ")
        .title_alignment(Alignment::Center);

    let mut spans = vec![
        Span::styled("Taux du ", Style::default().fg(Color::Gray)),
        Span::styled(
            format_last_updated(app.status.last_updated),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
    ];

    if model.are_rates_stale() && app.status.last_updated.is_some() {
        spans.push(Span::styled(" (périmés)", Style::default().fg(Color::Yellow)));
    }

    if app.status.is_loading {
        spans.push(Span::styled(
            "  ⟳ Chargement...",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::SLOW_BLINK),
        ));
    }

    // Un message ponctuel passe avant l'erreur du modèle
    if let Some(flash) = &app.flash {
        spans.push(Span::styled(format!("  {}", flash), Style::default().fg(Color::Magenta)));
    } else if let Some(error) = &app.status.error {
        spans.push(Span::styled(
            format!("  ⚠ {}", error),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}

// ============================================================================
// Main Content : liste des devises
// ============================================================================

fn render_main_content(frame: &mut Frame, app: &App, model: &ConversionModel, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" 💱 Devises ");

    if model.user_currencies().is_empty() {
        let text = vec![
            Line::from(""),
            Line::from(Span::styled("Aucune devise", Style::default().fg(Color::Gray))),
            Line::from(Span::styled(
                "[s] devises par défaut   [a] ajouter",
                Style::default().fg(Color::Yellow),
            )),
        ];

        let paragraph = Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center);

        frame.render_widget(paragraph, area);
        return;
    }

    let amounts = model.all_amounts();

    let items: Vec<ListItem> = model
        .user_currencies()
        .iter()
        .enumerate()
        .map(|(index, code)| {
            let is_active = code == model.active_currency();
            let amount = amounts.get(code).copied().unwrap_or(0.0);

            let line = format!(
                " {} {} {:<6} {:<28} {:>18}",
                if is_active { "●" } else { " " },
                currency_flag(code),
                code,
                currency_name(code),
                format_amount(amount),
            );

            let mut style = if is_active {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::White)
            };

            if index == app.selected_index {
                style = style.add_modifier(Modifier::BOLD).add_modifier(Modifier::REVERSED);
            }

            ListItem::new(line).style(style)
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

// ============================================================================
// Footer : raccourcis et confirmations
// ============================================================================

fn key_style(color: Color) -> Style {
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn confirmation_line(key: &str, message: String) -> Line<'static> {
    let warning = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    Line::from(vec![
        Span::styled("⚠  Appuyez sur ", warning),
        Span::styled(
            key.to_string(),
            key_style(Color::Red).add_modifier(Modifier::SLOW_BLINK),
        ),
        Span::styled(message, warning),
    ])
}

fn render_footer(frame: &mut Frame, app: &App, model: &ConversionModel, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let lines = if app.is_awaiting_delete_confirmation() {
        let code = model
            .user_currencies()
            .get(app.selected_index)
            .map(String::as_str)
            .unwrap_or("?");
        vec![confirmation_line(
            "[d]",
            format!(" à nouveau pour retirer {} ou autre touche pour annuler ⚠", code),
        )]
    } else if app.is_awaiting_quit_confirmation() {
        vec![confirmation_line(
            "[q]",
            " à nouveau pour quitter, ou n'importe quelle autre touche pour annuler ⚠".to_string(),
        )]
    } else {
        vec![
            Line::from(vec![
                Span::styled("[q]", key_style(Color::Yellow)),
                Span::raw(" Quit  "),
                Span::styled("[↑↓ / j k]", key_style(Color::Yellow)),
                Span::raw(" Navigate  "),
                Span::styled("[K J]", key_style(Color::Yellow)),
                Span::raw(" Move  "),
                Span::styled("[Enter]", key_style(Color::Yellow)),
                Span::raw(" Amount"),
            ]),
            Line::from(vec![
                Span::styled("[a]", key_style(Color::Green)),
                Span::raw(" Add  "),
                Span::styled("[n]", key_style(Color::Green)),
                Span::raw(" Suggest  "),
                Span::styled("[s]", key_style(Color::Green)),
                Span::raw(" Defaults  "),
                Span::styled("[d]", key_style(Color::Red)),
                Span::raw(" Remove  "),
                Span::styled("[r]", key_style(Color::Cyan)),
                Span::raw(" Refresh"),
            ]),
        ]
    };

    let paragraph = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center);

    frame.render_widget(paragraph, area);
}

/// Footer en mode saisie : prompt + buffer, puis aide ou suggestions
fn render_input_footer(frame: &mut Frame, app: &App, model: &ConversionModel, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let input_line = Line::from(vec![
        Span::styled(
            app.input_prompt.as_str(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(app.input_buffer.as_str(), Style::default().fg(Color::White)),
        Span::styled(
            "█",
            Style::default().fg(Color::White).add_modifier(Modifier::SLOW_BLINK),
        ),
    ]);

    let second_line = if app.current_screen == Screen::AddCurrency {
        let suggestions = search_currencies(&app.input_buffer, model.user_currencies());
        let shown: Vec<&str> = suggestions
            .iter()
            .take(SUGGESTIONS_SHOWN)
            .map(String::as_str)
            .collect();
        Line::from(vec![
            Span::styled("Suggestions : ", Style::default().fg(Color::Gray)),
            Span::styled(shown.join("  "), Style::default().fg(Color::Yellow)),
        ])
    } else {
        Line::from(vec![
            Span::styled("[Enter]", key_style(Color::Green)),
            Span::raw(" Confirm  "),
            Span::styled("[ESC]", key_style(Color::Red)),
            Span::raw(" Cancel"),
        ])
    };

    let paragraph = Paragraph::new(vec![input_line, second_line])
        .block(block)
        .alignment(Alignment::Left);

    frame.render_widget(paragraph, area);
}

// ============================================================================
// Formatage
// ============================================================================

/// Formate un montant avec deux décimales et séparateurs de milliers
///
/// 1234567.891 → "1,234,567.89"
pub fn format_amount(amount: f64) -> String {
    if !amount.is_finite() {
        return "N/A".to_string();
    }

    let fixed = format!("{:.2}", amount.abs());
    let (integer, decimals) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    // Pas de "-0.00"
    let sign = if amount < 0.0 && fixed.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };

    format!("{}{}.{}", sign, grouped, decimals)
}

/// Date de mise à jour des taux, en heure locale
pub fn format_last_updated(last_updated: Option<DateTime<Utc>>) -> String {
    match last_updated {
        Some(at) => at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        None => "Jamais".to_string(),
    }
}
