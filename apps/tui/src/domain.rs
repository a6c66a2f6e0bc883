use serde::{Deserialize, Deserializer, Serialize};

/// Per-flow drawing options. Every field is optional; absent fields take the
/// map's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowOptions {
    /// Stroke width override, replaces the magnitude-scaled width.
    pub width: Option<f64>,
    pub show_label: Option<bool>,
    /// Label text override. Placement is unchanged.
    pub label: Option<String>,
    pub animated: Option<bool>,
}

impl FlowOptions {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_animated(mut self, animated: bool) -> Self {
        self.animated = Some(animated);
        self
    }

    #[must_use]
    pub const fn with_show_label(mut self, show_label: bool) -> Self {
        self.show_label = Some(show_label);
        self
    }

    #[must_use]
    pub const fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }
}

/// One trade flow as delivered by the data provider.
///
/// Accepts both the short field names and the Comtrade spelling
/// (`reporterCode`, `partnerCode`, `tradeValue`); when a record carries both,
/// the short name wins. Codes may be strings or numbers; numeric codes are
/// zero-padded to three digits. A missing code decodes as an empty string and
/// the record is skipped when flows are loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFlowRecord")]
pub struct FlowRecord {
    pub from: String,
    pub to: String,
    pub value: Option<f64>,
    pub options: FlowOptions,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFlowRecord {
    #[serde(default, deserialize_with = "country_code")]
    from: Option<String>,
    #[serde(default, deserialize_with = "country_code")]
    reporter_code: Option<String>,
    #[serde(default, deserialize_with = "country_code")]
    to: Option<String>,
    #[serde(default, deserialize_with = "country_code")]
    partner_code: Option<String>,
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    trade_value: Option<f64>,
    #[serde(default)]
    options: FlowOptions,
}

impl From<RawFlowRecord> for FlowRecord {
    fn from(raw: RawFlowRecord) -> Self {
        // A zero value falls through to the Comtrade field.
        let value = raw
            .value
            .filter(|v| *v != 0.0)
            .or(raw.trade_value)
            .or(raw.value);
        Self {
            from: raw.from.or(raw.reporter_code).unwrap_or_default(),
            to: raw.to.or(raw.partner_code).unwrap_or_default(),
            value,
            options: raw.options,
        }
    }
}

impl FlowRecord {
    pub fn new(from: impl Into<String>, to: impl Into<String>, value: f64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            value: Some(value),
            options: FlowOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: FlowOptions) -> Self {
        self.options = options;
        self
    }

    pub fn magnitude(&self) -> f64 {
        self.value.unwrap_or(0.0)
    }

    pub fn has_codes(&self) -> bool {
        !self.from.is_empty() && !self.to.is_empty()
    }
}

fn country_code<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Text(String),
        Number(u32),
    }

    let code = match Option::<Code>::deserialize(deserializer)? {
        Some(Code::Text(code)) => code.trim().to_string(),
        Some(Code::Number(code)) => format!("{code:03}"),
        None => return Ok(None),
    };
    Ok(Some(code).filter(|code| !code.is_empty()))
}

/// A magnitude only counts when it is a finite, positive number.
pub fn has_magnitude(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Formats a trade value for a flow label: `$X.XM` from one million up,
/// `$XK` below.
pub fn format_trade_value(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("${}M", one_decimal(value / 1_000_000.0))
    } else {
        let thousands = (value / 1000.0).round();
        format!("${thousands:.0}K")
    }
}

/// Rounds to one decimal from the exact binary value, halves away from zero.
/// Only called with `x >= 1`.
fn one_decimal(x: f64) -> String {
    if !x.is_finite() {
        return format!("{x}");
    }
    // An f64 >= 1 has at most 52 fractional bits, so 60 places are exact.
    let exact = format!("{x:.60}");
    let (int_part, frac) = exact.split_once('.').unwrap_or((exact.as_str(), "0"));
    let frac = frac.as_bytes();

    let mut digits: Vec<u8> = int_part.bytes().collect();
    digits.push(frac.first().copied().unwrap_or(b'0'));
    if frac.get(1).is_some_and(|d| *d >= b'5') {
        increment_decimal(&mut digits);
    }

    let (whole, tenth) = digits.split_at(digits.len() - 1);
    format!(
        "{}.{}",
        String::from_utf8_lossy(whole),
        String::from_utf8_lossy(tenth)
    )
}

fn increment_decimal(digits: &mut Vec<u8>) {
    for digit in digits.iter_mut().rev() {
        if *digit == b'9' {
            *digit = b'0';
        } else {
            *digit += 1;
            return;
        }
    }
    digits.insert(0, b'1');
}

/// Stroke width for a flow: logarithmic in the magnitude so large flows do not
/// dominate the map.
pub fn scaled_stroke_width(base: f64, magnitude: f64) -> f64 {
    if has_magnitude(magnitude) {
        base * 0.5_f64.mul_add((1.0 + magnitude / 1000.0).log10(), 1.0)
    } else {
        base
    }
}
