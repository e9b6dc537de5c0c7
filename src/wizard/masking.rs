//! Display-only redaction for sensitive fields. One-way transforms applied at
//! render time; the canonical snapshot always keeps the unmasked values.

use super::validators;

/// Keep the country-code literal and last four digits, mask the rest.
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() < validators::PHONE_DIGITS {
        return phone.to_string();
    }
    let last_four: String = chars[chars.len() - 4..].iter().collect();
    format!("91******{last_four}")
}

/// Keep the first character and last two, mask the interior. Indexed by
/// character, not byte; stored values may carry multibyte characters.
pub fn mask_tax_id(tax_id: &str) -> String {
    let chars: Vec<char> = tax_id.chars().collect();
    if chars.len() < validators::TAX_ID_LEN {
        return tax_id.to_string();
    }
    let first = chars[0];
    let last_two: String = chars[chars.len() - 2..].iter().collect();
    format!("{first}*****{last_two}")
}

/// Keep the first letter of the first two tokens, mask the remainder of each.
pub fn mask_name(name: &str) -> String {
    let mut tokens = name.split_whitespace();
    let first = match tokens.next() {
        Some(token) => token,
        None => return String::new(),
    };
    let first_initial = initial(first);
    match tokens.next() {
        Some(second) => format!("{}*** {}***", first_initial, initial(second)),
        None => format!("{first_initial}***"),
    }
}

fn initial(token: &str) -> String {
    token.chars().take(1).collect()
}
