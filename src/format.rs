//! Display formatting for quantities, currency and state names.

/// Two-letter codes used on state charts and location labels.
pub const STATE_ABBREVIATIONS: &[(&str, &str)] = &[
    ("Andhra Pradesh", "AP"),
    ("Arunachal Pradesh", "AR"),
    ("Assam", "AS"),
    ("Bihar", "BR"),
    ("Chhattisgarh", "CG"),
    ("Goa", "GA"),
    ("Gujarat", "GJ"),
    ("Haryana", "HR"),
    ("Himachal Pradesh", "HP"),
    ("Jharkhand", "JH"),
    ("Karnataka", "KA"),
    ("Kerala", "KL"),
    ("Madhya Pradesh", "MP"),
    ("Maharashtra", "MH"),
    ("Manipur", "MN"),
    ("Meghalaya", "ML"),
    ("Mizoram", "MZ"),
    ("Nagaland", "NL"),
    ("Odisha", "OD"),
    ("Punjab", "PB"),
    ("Rajasthan", "RJ"),
    ("Sikkim", "SK"),
    ("Tamil Nadu", "TN"),
    ("Telangana", "TG"),
    ("Tripura", "TR"),
    ("Uttarakhand", "UK"),
    ("Uttar Pradesh", "UP"),
    ("West Bengal", "WB"),
];

/// Returns the state's code, or the name itself when it has none.
pub fn abbreviate_state(state: &str) -> &str {
    STATE_ABBREVIATIONS
        .iter()
        .find(|(name, _)| *name == state)
        .map(|(_, code)| *code)
        .unwrap_or(state)
}

/// `"1,23,456.5 Qtl"`: en-IN grouping, at most three decimals.
pub fn format_quantity(value: f64) -> String {
    format!("{} Qtl", format_indian(value, 0, 3))
}

/// `"₹1,23,456.00"`: en-IN grouping, exactly two decimals.
pub fn format_currency(value: f64) -> String {
    let formatted = format_indian(value.abs(), 2, 2);
    if value <= -0.005 {
        format!("-₹{}", formatted)
    } else {
        format!("₹{}", formatted)
    }
}

/// Groups the integer part as lakhs and crores: the last three digits, then
/// pairs. Keeps between `min_decimals` and `max_decimals` fraction digits.
pub fn format_indian(value: f64, min_decimals: usize, max_decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let rendered = format!("{:.*}", max_decimals, value.abs());
    let (int_part, frac_part) = match rendered.split_once('.') {
        Some((i, f)) => (i.to_string(), f.to_string()),
        None => (rendered.clone(), String::new()),
    };

    let mut frac = frac_part;
    while frac.len() > min_decimals && frac.ends_with('0') {
        frac.pop();
    }

    let grouped = group_indian(&int_part);
    let is_zero = grouped == "0" && frac.chars().all(|c| c == '0');
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };

    if frac.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac)
    }
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}
