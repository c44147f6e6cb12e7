//! Message and price formatting helpers.
//!
//! Scraped price text arrives in whatever shape the storefront renders:
//! currency symbols, ISO codes, thousands groups, comma or dot decimals.
//! `price` reduces it to a plain `f64`-parseable string, using the
//! configured currency to decide which separator is the decimal one.

/// Thin/narrow no-break spaces used as digit-group separators.
const NBSP: char = '\u{a0}';
const NNBSP: char = '\u{202f}';

/// Separator conventions for one family of currencies.
#[derive(Debug, Clone, Copy, PartialEq)]
struct NumberFormat {
    decimal: char,
    thousands: &'static [char],
}

const COMMA_DECIMAL: NumberFormat = NumberFormat {
    decimal: ',',
    thousands: &['.', ' ', NBSP, NNBSP],
};

const DOT_DECIMAL: NumberFormat = NumberFormat {
    decimal: '.',
    thousands: &[','],
};

const SWISS: NumberFormat = NumberFormat {
    decimal: '.',
    thousands: &['\'', '’'],
};

impl NumberFormat {
    fn for_currency(currency: &str) -> Self {
        match currency.trim().to_ascii_uppercase().as_str() {
            "EUR" | "DKK" | "NOK" | "SEK" | "PLN" | "CZK" | "HUF" | "RON" | "TRY" | "BRL"
            | "RUB" | "IDR" | "ARS" => COMMA_DECIMAL,
            "CHF" => SWISS,
            // USD, GBP, CAD, AUD, JPY, INR, CNY, MXN, ... and anything unknown
            _ => DOT_DECIMAL,
        }
    }

    fn is_thousands(&self, c: char) -> bool {
        self.thousands.contains(&c)
    }

    /// Whether `rest` opens with a separator of this format followed by a digit.
    fn separator_follows(&self, rest: &[char]) -> bool {
        matches!(rest, [sep, d, ..]
            if (*sep == self.decimal || self.is_thousands(*sep)) && d.is_ascii_digit())
    }
}

/// Number of consecutive ASCII digits at the start of `chars`.
fn digit_run(chars: &[char]) -> usize {
    chars.iter().take_while(|c| c.is_ascii_digit()).count()
}

/// Prefix a message with the task it belongs to.
pub fn task_msg(task: &str, msg: &str) -> String {
    format!("[{task}] {msg}")
}

/// Normalise scraped price text into a numeric string.
///
/// Only the first numeric run is used, so a range such as `£10.99 - £15.99`
/// yields its lower bound. The currency's thousands separator is skipped
/// when followed by three digits or by another separator further along the
/// run, which covers irregular groups such as `₹1,23,456.00`. A lone `.`/`,`
/// that cannot be a group separator is taken as the decimal point, and so
/// is one directly before the first digit (`$.99`). Text without any digit
/// comes back trimmed and unchanged so that the caller's parse error can
/// name it.
pub fn price(text: &str, currency: &str) -> String {
    let format = NumberFormat::for_currency(currency);
    let text = text.trim();

    let Some(start) = text.find(|c: char| c.is_ascii_digit()) else {
        return text.to_string();
    };

    let chars: Vec<char> = text[start..].chars().collect();
    let mut out = String::with_capacity(chars.len() + 2);
    let mut seen_decimal = false;

    if let Some(lead) = text[..start].chars().next_back() {
        if lead == format.decimal || lead == '.' || lead == ',' {
            out.push_str("0.");
            seen_decimal = true;
        }
    }

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_digit() {
            out.push(c);
            continue;
        }
        if seen_decimal {
            break;
        }

        let group = digit_run(&chars[i + 1..]);
        if c == format.decimal && group > 0 {
            out.push('.');
            seen_decimal = true;
        } else if format.is_thousands(c)
            && (group == 3 || (group > 0 && format.separator_follows(&chars[i + 1 + group..])))
        {
            continue;
        } else if (c == '.' || c == ',') && group > 0 {
            out.push('.');
            seen_decimal = true;
        } else {
            break;
        }
    }

    out
}

/// Human-readable summary of a price move for one task.
pub fn price_delta(new_price: f64, old_price: f64, currency: &str, task: &str) -> String {
    let diff = new_price - old_price;
    task_msg(
        task,
        &format!("price changed: {old_price:.2} {currency} -> {new_price:.2} {currency} ({diff:+.2})"),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
