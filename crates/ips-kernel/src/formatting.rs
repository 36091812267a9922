//! Display formatting of variable values
//!
//! A variable is formatted through its effective presentation: the legacy
//! presentation resolves a named profile, the enumeration presentation
//! looks the value up in its `OPTIONS`. Without presentation the raw value
//! text is returned.

use ips_core::constants::presentation;
use ips_core::{KernelError, KernelResult, ObjectId, Value, VariableType};
use ips_registries::VariableProfile;

use crate::conditions::{json_to_value, loose_cmp};
use crate::kernel::Kernel;

impl Kernel {
    /// Format the current value of a variable
    pub fn get_value_formatted(&self, id: ObjectId) -> KernelResult<String> {
        let value = self.variables().read(id)?;
        self.get_value_formatted_ex(id, value)
    }

    /// Format `value` as if it were the value of variable `id`
    pub fn get_value_formatted_ex(&self, id: ObjectId, value: impl Into<Value>) -> KernelResult<String> {
        let value = value.into();
        let variable = self.variables().get(id)?;
        value.check_type(&format!("Variable #{}", id), variable.variable_type)?;

        let record = variable.effective_presentation();
        if record.is_empty() {
            return Ok(value.to_string());
        }

        let kind = record
            .get(presentation::KEY_PRESENTATION)
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        match kind {
            presentation::LEGACY => {
                let profile = record
                    .get(presentation::KEY_PROFILE)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                self.format_legacy(variable.variable_type, profile, &value)
            }
            presentation::ENUMERATION => {
                format_enumeration(record.get(presentation::KEY_OPTIONS), &value)
            }
            other => Err(KernelError::not_implemented(format!("presentation {}", other))),
        }
    }

    fn format_legacy(&self, variable_type: VariableType, name: &str, value: &Value) -> KernelResult<String> {
        let Ok(profile) = self.profiles().get(name) else {
            return Ok("Invalid profile".to_string());
        };
        if profile.profile_type != variable_type {
            return Ok("Invalid profile type".to_string());
        }

        match name {
            "~UnixTimestamp" | "~UnixTimestampTime" | "~UnixTimestampDate" => {
                return Err(KernelError::not_implemented("timestamp profiles"));
            }
            "~HexColor" => return Ok(String::new()),
            _ => {}
        }

        if profile.associations.is_empty() {
            format_plain(&profile, value)
        } else {
            format_associations(&profile, value)
        }
    }
}

/// Value rescaled into 0..100 when the profile is a percent profile
fn percent(profile: &VariableProfile, value: f64) -> Option<f64> {
    let range = profile.max_value - profile.min_value;
    (profile.suffix.trim() == "%" && range > 0.0)
        .then(|| (value - profile.min_value) * 100.0 / range)
}

fn format_plain(profile: &VariableProfile, value: &Value) -> KernelResult<String> {
    let text = match value {
        Value::Boolean(_) => {
            return Err(KernelError::invalid(
                "profiles of type boolean need to have two associations",
            ))
        }
        Value::Integer(v) => match percent(profile, *v as f64) {
            Some(p) => format!("{}", p.round() as i64),
            None => v.to_string(),
        },
        // Rounded to a whole number first; digits only pad with zeros
        Value::Float(v) => {
            let shown = percent(profile, *v).unwrap_or(*v);
            number_format(shown.round(), profile.digits)
        }
        Value::String(v) => v.clone(),
    };
    Ok(format!("{}{}{}", profile.prefix, text, profile.suffix))
}

fn format_associations(profile: &VariableProfile, value: &Value) -> KernelResult<String> {
    let wrap = |name: &str| format!("{}{}{}", profile.prefix, sprintf(name, value), profile.suffix);

    match value {
        Value::Boolean(b) => {
            if profile.associations.len() < 2 {
                return Err(KernelError::invalid(
                    "profiles of type boolean need to have two associations",
                ));
            }
            let index = usize::from(*b);
            Ok(profile
                .associations
                .get(index)
                .map(|a| a.name.clone())
                .unwrap_or_else(|| "-".to_string()))
        }
        Value::Integer(_) | Value::Float(_) => {
            let number = value.numeric().unwrap_or_default();
            Ok(profile
                .associations
                .iter()
                .rev()
                .find(|a| a.value.numeric().is_some_and(|threshold| number >= threshold))
                .map(|a| wrap(&a.name))
                .unwrap_or_else(|| "-".to_string()))
        }
        Value::String(_) => Ok(profile
            .associations
            .iter()
            .rev()
            .find(|a| &a.value == value)
            .map(|a| wrap(&a.name))
            .unwrap_or_else(|| "-".to_string())),
    }
}

fn format_enumeration(options: Option<&serde_json::Value>, value: &Value) -> KernelResult<String> {
    let parsed;
    let options = match options {
        Some(serde_json::Value::String(text)) => {
            parsed = serde_json::from_str::<serde_json::Value>(text)
                .map_err(|e| KernelError::invalid(format!("cannot parse OPTIONS: {}", e)))?;
            &parsed
        }
        Some(options) => options,
        None => return Ok("-".to_string()),
    };
    let options = options
        .as_array()
        .ok_or_else(|| KernelError::invalid("OPTIONS must be a list"))?;

    for option in options {
        let matches = option
            .get("Value")
            .and_then(json_to_value)
            .is_some_and(|candidate| loose_cmp(&candidate, value) == Some(std::cmp::Ordering::Equal));
        if matches {
            return Ok(match option.get("Caption") {
                Some(serde_json::Value::String(caption)) => caption.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            });
        }
    }
    Ok("-".to_string())
}

/// Fixed decimals with `,` as thousands separator
fn number_format(value: f64, digits: i32) -> String {
    let digits = usize::try_from(digits).unwrap_or(0);
    let scale = 10f64.powi(digits as i32);
    let rounded = (value * scale).round() / scale;
    let formatted = format!("{:.*}", digits, rounded);

    let (negative, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => (rounded != 0.0, rest),
        None => (false, formatted.as_str()),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(formatted.len() + integer.len() / 3);
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

/// printf-style substitution of `%d`, `%f`, `%.Nf`, `%s` and `%%`
fn sprintf(template: &str, value: &Value) -> String {
    let number = || match value {
        Value::String(s) => s.trim().parse::<f64>().unwrap_or_default(),
        other => other.numeric().unwrap_or_default(),
    };

    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut spec = String::from("%");
        let mut precision = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            spec.push('.');
            let mut digits = String::new();
            while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                digits.push(d);
                chars.next();
            }
            spec.push_str(&digits);
            precision = Some(digits.parse::<usize>().unwrap_or(0));
        }

        match chars.next() {
            Some('%') if precision.is_none() => out.push('%'),
            Some('d') => out.push_str(&(number().trunc() as i64).to_string()),
            Some('f') => out.push_str(&format!("{:.*}", precision.unwrap_or(6), number())),
            Some('s') => out.push_str(&value.to_string()),
            Some(other) => {
                out.push_str(&spec);
                out.push(other);
            }
            None => out.push_str(&spec),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ips_config::KernelConfig;
    use ips_core::ErrorKind;
    use ips_registries::{legacy_presentation, Presentation};

    fn make_test_kernel() -> Kernel {
        let kernel = Kernel::new(KernelConfig::default());
        kernel.reset();
        kernel
    }

    fn make_test_variable(kernel: &Kernel, variable_type: VariableType, profile: &str) -> ObjectId {
        let id = kernel.create_variable(variable_type).unwrap();
        kernel.variables().set_profile(id, profile).unwrap();
        id
    }

    #[test]
    fn test_number_format() {
        assert_eq!(number_format(1234567.891, 2), "1,234,567.89");
        assert_eq!(number_format(999.999, 2), "1,000.00");
        assert_eq!(number_format(-1234.5, 0), "-1,235");
        assert_eq!(number_format(-0.001, 2), "0.00");
        assert_eq!(number_format(12.0, 0), "12");
    }

    #[test]
    fn test_sprintf() {
        assert_eq!(sprintf("%d W", &Value::Float(12.7)), "12 W");
        assert_eq!(sprintf("%.1f °C", &Value::Float(21.26)), "21.3 °C");
        assert_eq!(sprintf("%f", &Value::Integer(1)), "1.000000");
        assert_eq!(sprintf("%s%%", &Value::Integer(50)), "50%");
        assert_eq!(sprintf("Open", &Value::Integer(1)), "Open");
        assert_eq!(sprintf("%x", &Value::Integer(1)), "%x");
    }

    #[test]
    fn test_no_presentation_is_raw_text() {
        let kernel = make_test_kernel();
        let id = kernel.create_variable(VariableType::Integer).unwrap();
        kernel.set_value_integer(id, 42).unwrap();
        assert_eq!(kernel.get_value_formatted(id).unwrap(), "42");
        assert_eq!(
            kernel.get_value_formatted_ex(id, "x").unwrap_err().kind(),
            ErrorKind::TypeMismatch
        );
    }

    #[test]
    fn test_invalid_profiles() {
        let kernel = make_test_kernel();
        let id = make_test_variable(&kernel, VariableType::Integer, "Missing");
        assert_eq!(kernel.get_value_formatted(id).unwrap(), "Invalid profile");

        kernel.profiles().create("Text", VariableType::String).unwrap();
        kernel.variables().set_profile(id, "Text").unwrap();
        assert_eq!(kernel.get_value_formatted(id).unwrap(), "Invalid profile type");
    }

    #[test]
    fn test_special_profiles() {
        let kernel = make_test_kernel();
        kernel
            .profiles()
            .insert(VariableProfile::new("~UnixTimestamp", VariableType::Integer))
            .unwrap();
        kernel
            .profiles()
            .insert(VariableProfile::new("~HexColor", VariableType::Integer))
            .unwrap();

        let id = make_test_variable(&kernel, VariableType::Integer, "~UnixTimestamp");
        assert_eq!(
            kernel.get_value_formatted(id).unwrap_err().kind(),
            ErrorKind::NotImplemented
        );
        kernel.variables().set_profile(id, "~HexColor").unwrap();
        assert_eq!(kernel.get_value_formatted(id).unwrap(), "");
    }

    #[test]
    fn test_percent_and_digits() {
        let kernel = make_test_kernel();
        kernel
            .profiles()
            .insert(
                VariableProfile::new("Level", VariableType::Integer)
                    .with_text("", " %")
                    .with_values(0.0, 255.0, 1.0),
            )
            .unwrap();
        let level = make_test_variable(&kernel, VariableType::Integer, "Level");
        assert_eq!(kernel.get_value_formatted_ex(level, 128).unwrap(), "50 %");

        kernel
            .profiles()
            .insert(VariableProfile::new("Energy", VariableType::Float).with_text("", " kWh"))
            .unwrap();
        kernel.profiles().set_digits("Energy", 2).unwrap();
        let energy = make_test_variable(&kernel, VariableType::Float, "Energy");
        assert_eq!(
            kernel.get_value_formatted_ex(energy, 1234.567).unwrap(),
            "1,235.00 kWh"
        );
        assert_eq!(kernel.get_value_formatted_ex(energy, 21.4).unwrap(), "21.00 kWh");
        assert_eq!(kernel.get_value_formatted_ex(energy, -0.5).unwrap(), "-1.00 kWh");

        kernel
            .profiles()
            .insert(VariableProfile::new("Named", VariableType::String).with_text("<", ">"))
            .unwrap();
        let named = make_test_variable(&kernel, VariableType::String, "Named");
        assert_eq!(kernel.get_value_formatted_ex(named, "x").unwrap(), "<x>");
    }

    #[test]
    fn test_boolean_profiles() {
        let kernel = make_test_kernel();
        kernel
            .profiles()
            .insert(
                VariableProfile::new("~Switch", VariableType::Boolean)
                    .with_association(true, "An")
                    .with_association(false, "Aus"),
            )
            .unwrap();
        let id = make_test_variable(&kernel, VariableType::Boolean, "~Switch");
        assert_eq!(kernel.get_value_formatted_ex(id, true).unwrap(), "An");
        assert_eq!(kernel.get_value_formatted_ex(id, false).unwrap(), "Aus");

        kernel.profiles().create("Plain", VariableType::Boolean).unwrap();
        kernel.variables().set_profile(id, "Plain").unwrap();
        assert_eq!(
            kernel.get_value_formatted(id).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_numeric_thresholds() {
        let kernel = make_test_kernel();
        kernel
            .profiles()
            .insert(
                VariableProfile::new("Window", VariableType::Integer)
                    .with_text("[", "]")
                    .with_association(0, "Closed")
                    .with_association(1, "Tilted %d")
                    .with_association(10, "Open"),
            )
            .unwrap();
        let id = make_test_variable(&kernel, VariableType::Integer, "Window");
        assert_eq!(kernel.get_value_formatted_ex(id, -1).unwrap(), "-");
        assert_eq!(kernel.get_value_formatted_ex(id, 0).unwrap(), "[Closed]");
        assert_eq!(kernel.get_value_formatted_ex(id, 5).unwrap(), "[Tilted 5]");
        assert_eq!(kernel.get_value_formatted_ex(id, 10).unwrap(), "[Open]");
    }

    #[test]
    fn test_string_associations() {
        let kernel = make_test_kernel();
        kernel
            .profiles()
            .insert(
                VariableProfile::new("Mode", VariableType::String)
                    .with_association("eco", "Economy")
                    .with_association("boost", "Boost"),
            )
            .unwrap();
        let id = make_test_variable(&kernel, VariableType::String, "Mode");
        assert_eq!(kernel.get_value_formatted_ex(id, "boost").unwrap(), "Boost");
        assert_eq!(kernel.get_value_formatted_ex(id, "off").unwrap(), "-");
    }

    #[test]
    fn test_enumeration_presentation() {
        let kernel = make_test_kernel();
        let id = kernel.create_variable(VariableType::Integer).unwrap();
        let mut record = Presentation::new();
        record.insert("PRESENTATION".to_string(), presentation::ENUMERATION.into());
        record.insert(
            "OPTIONS".to_string(),
            r#"[{"Value": 0, "Caption": "Off"}, {"Value": 1, "Caption": "On"}]"#.into(),
        );
        kernel.variables().set_presentation(id, record).unwrap();

        assert_eq!(kernel.get_value_formatted_ex(id, 1).unwrap(), "On");
        assert_eq!(kernel.get_value_formatted_ex(id, 7).unwrap(), "-");
    }

    #[test]
    fn test_custom_presentation_wins() {
        let kernel = make_test_kernel();
        kernel
            .profiles()
            .insert(VariableProfile::new("Watt", VariableType::Integer).with_text("", " W"))
            .unwrap();
        let id = kernel.create_variable(VariableType::Integer).unwrap();
        kernel.variables().set_presentation(id, legacy_presentation("Missing")).unwrap();
        kernel
            .variables()
            .set_custom_presentation(id, legacy_presentation("Watt"))
            .unwrap();
        assert_eq!(kernel.get_value_formatted_ex(id, 3).unwrap(), "3 W");

        let mut other = Presentation::new();
        other.insert("PRESENTATION".to_string(), presentation::SLIDER.into());
        kernel.variables().set_custom_presentation(id, other).unwrap();
        assert_eq!(
            kernel.get_value_formatted(id).unwrap_err().kind(),
            ErrorKind::NotImplemented
        );
    }
}
