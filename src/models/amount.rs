// ============================================================================
// Saisie des montants
// ============================================================================
// Les montants arrivent depuis des champs texte : on lit le plus long
// préfixe numérique ("12.5abc" -> 12.5). Toute saisie invalide vaut 0,
// jamais une erreur.
// ============================================================================

/// Conversion d'une saisie utilisateur en montant
///
/// CONCEPT RUST : Trait pour accepter plusieurs types en paramètre
/// - `set_active_amount(750.0)` et `set_active_amount("750")` fonctionnent
pub trait IntoAmount {
    fn into_amount(self) -> f64;
}

impl IntoAmount for f64 {
    fn into_amount(self) -> f64 {
        sanitize(self)
    }
}

impl IntoAmount for &str {
    fn into_amount(self) -> f64 {
        parse_amount(self)
    }
}

impl IntoAmount for String {
    fn into_amount(self) -> f64 {
        parse_amount(&self)
    }
}

impl IntoAmount for &String {
    fn into_amount(self) -> f64 {
        parse_amount(self)
    }
}

/// NaN et infinis deviennent 0
fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Parse le préfixe numérique d'une saisie
///
/// # Exemples
/// parse_amount("750") == 750.0
/// parse_amount("  12.5 EUR") == 12.5
/// parse_amount("abc") == 0.0
pub fn parse_amount(input: &str) -> f64 {
    let input = input.trim_start();
    let prefix = numeric_prefix(input);

    prefix.parse::<f64>().map(sanitize).unwrap_or(0.0)
}

/// Retourne le plus long préfixe de la forme `[+-]?digits[.digits][e[+-]digits]`
fn numeric_prefix(input: &str) -> &str {
    let bytes = input.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut has_digits = end > digits_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let mut frac_end = end + 1;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if has_digits || frac_end > end + 1 {
            has_digits = true;
            end = frac_end;
        }
    }

    if !has_digits {
        return "";
    }

    // Exposant seulement s'il est suivi d'au moins un chiffre
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    &input[..end]
}
