//! Locale-invariant number formatting driven by Excel format strings.
//!
//! Excel stores dates as floating-point serial numbers: the integer part
//! counts days since 1899-12-30 (with the Lotus 1-2-3 bug that treats
//! 1900 as a leap year), and the fractional part is the time of day.
//! Whether a number is shown as a date, a currency amount or a percentage
//! depends entirely on its format string (or built-in `numFmtId`).
//!
//! [`format_raw_cell_contents`] picks the section of the format string that
//! applies to the value and renders it with `.` as the decimal separator and
//! `,` as the grouping separator, whatever the host locale.

/// Built-in numFmtIds that Excel defines as date/time formats.
///
/// Source: ECMA-376 Part 1, §18.8.30 (numFmt) and Microsoft documentation.
/// These IDs are hardcoded into Excel and never appear in styles.xml.
const BUILTIN_DATE_FMT_IDS: &[u16] = &[
    14, 15, 16, 17, 18, 19, 20, 21, 22, // standard date/time
    27, 28, 29, 30, 31, 32, 33, 34, 35, 36, // CJK date formats
    45, 46, 47, // time formats (mm:ss, [h]:mm:ss, mm:ss.0)
    50, 51, 52, 53, 54, 55, 56, 57, 58, // CJK extended date formats
];

/// Format strings of the built-in ids that are locale-independent.
pub fn builtin_format(id: u16) -> Option<&'static str> {
    let fmt = match id {
        0 => "General",
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        5 => "\"$\"#,##0_);(\"$\"#,##0)",
        6 => "\"$\"#,##0_);[Red](\"$\"#,##0)",
        7 => "\"$\"#,##0.00_);(\"$\"#,##0.00)",
        8 => "\"$\"#,##0.00_);[Red](\"$\"#,##0.00)",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "m/d/yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        37 => "#,##0_);(#,##0)",
        38 => "#,##0_);[Red](#,##0)",
        39 => "#,##0.00_);(#,##0.00)",
        40 => "#,##0.00_);[Red](#,##0.00)",
        41 => "_(* #,##0_);_(* (#,##0);_(* \"-\"_);_(@_)",
        42 => "_(\"$\"* #,##0_);_(\"$\"* (#,##0);_(\"$\"* \"-\"_);_(@_)",
        43 => "_(* #,##0.00_);_(* (#,##0.00);_(* \"-\"??_);_(@_)",
        44 => "_(\"$\"* #,##0.00_);_(\"$\"* (#,##0.00);_(\"$\"* \"-\"??_);_(@_)",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mm:ss.0",
        48 => "##0.0E+0",
        49 => "@",
        _ => return None,
    };
    Some(fmt)
}

/// Check if a `numFmtId` refers to a date/time format.
pub fn is_date_format_id(id: u16) -> bool {
    BUILTIN_DATE_FMT_IDS.contains(&id)
}

/// Check if a custom format string looks like a date/time format.
///
/// Heuristic: if the format contains date/time tokens (`y`, `m`, `d`, `h`, `s`)
/// but not number tokens (`0`, `#`, `?`), it's a date format. Ignores content
/// inside quoted strings, backslash-escaped characters and bracketed
/// color/locale/condition codes (elapsed-time brackets like `[h]` count).
pub fn is_date_format_string(fmt: &str) -> bool {
    let mut has_date_token = false;
    let mut has_number_token = false;
    let mut in_quote = false;
    let mut prev_backslash = false;
    let mut in_fraction = false;
    let mut last = None;
    let mut chars = fmt.chars();

    while let Some(ch) = chars.next() {
        if prev_backslash {
            prev_backslash = false;
            continue;
        }
        // Fractional seconds: the zeros in `ss.000` are not number tokens.
        if in_fraction && ch == '0' {
            continue;
        }
        in_fraction = ch == '.' && last == Some('s');
        if ch == '\\' || (!in_quote && (ch == '_' || ch == '*')) {
            prev_backslash = true;
            continue;
        }
        if ch == '"' {
            in_quote = !in_quote;
            continue;
        }
        if in_quote {
            continue;
        }
        if ch == '[' {
            let inner: String = chars.by_ref().take_while(|&c| c != ']').collect();
            if is_elapsed_time_bracket(&inner) {
                has_date_token = true;
            }
            continue;
        }

        last = Some(ch.to_ascii_lowercase());
        match ch.to_ascii_lowercase() {
            // 'm' is ambiguous (month or minute) but in date context it's always date
            'y' | 'd' | 'h' | 's' | 'm' => has_date_token = true,
            '0' | '#' | '?' => has_number_token = true,
            _ => {}
        }
    }

    has_date_token && !has_number_token
}

fn is_elapsed_time_bracket(inner: &str) -> bool {
    !inner.is_empty()
        && inner
            .chars()
            .all(|c| matches!(c.to_ascii_lowercase(), 'h' | 'm' | 's'))
}

/// Format a number with the style's format id and (optional) format string.
///
/// The explicit string wins; otherwise the built-in table is consulted. A
/// built-in date id without a locale-independent string renders as ISO 8601.
pub fn format_raw_cell_contents(value: f64, format_id: u16, format_string: Option<&str>) -> String {
    let fmt = format_string
        .filter(|s| !s.trim().is_empty())
        .or_else(|| builtin_format(format_id));

    let Some(fmt) = fmt else {
        if is_date_format_id(format_id) {
            return serial_to_iso(value);
        }
        return format_general(value);
    };

    let sections = split_sections(fmt);
    let (section, number, auto_sign) = pick_section(&sections, value);

    if is_general_section(section) {
        let s = format_general(number.abs());
        return with_sign(s, number, auto_sign);
    }

    if is_date_format_string(section) {
        return format_date(number, section);
    }

    format_number(number, section, auto_sign)
}

/// Split a format string on `;` outside quotes, escapes and brackets.
fn split_sections(fmt: &str) -> Vec<&str> {
    let mut sections = Vec::new();
    let mut start = 0;
    let mut in_quote = false;
    let mut in_bracket = false;
    let mut escaped = false;

    for (idx, ch) in fmt.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if !in_quote => escaped = true,
            '"' => in_quote = !in_quote,
            '[' if !in_quote => in_bracket = true,
            ']' if !in_quote => in_bracket = false,
            ';' if !in_quote && !in_bracket => {
                sections.push(&fmt[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    sections.push(&fmt[start..]);
    sections
}

/// Choose the section for `value`. Returns the section, the value to render
/// and whether a `-` must be prepended for negatives.
fn pick_section<'a>(sections: &[&'a str], value: f64) -> (&'a str, f64, bool) {
    match sections {
        [only] => (*only, value, true),
        [pos, neg, ..] if value < 0.0 => {
            // An empty negative section shows the positive one with a sign.
            if neg.is_empty() {
                (*pos, value, true)
            } else {
                (*neg, value.abs(), false)
            }
        }
        [_, _, zero, ..] if value == 0.0 => (*zero, value, false),
        [pos, ..] => (*pos, value, true),
        [] => ("General", value, true),
    }
}

fn is_general_section(section: &str) -> bool {
    let stripped = strip_brackets(section);
    let stripped = stripped.trim();
    stripped.is_empty() || stripped.eq_ignore_ascii_case("general") || stripped == "@"
}

fn strip_brackets(section: &str) -> String {
    let mut out = String::with_capacity(section.len());
    let mut depth = 0;
    for ch in section.chars() {
        match ch {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out
}

fn with_sign(s: String, value: f64, auto_sign: bool) -> String {
    if auto_sign && value < 0.0 {
        format!("-{s}")
    } else {
        s
    }
}

// ── General ────────────────────────────────────────────────────────

/// Excel's "General" rendering: up to ten significant digits, scientific
/// notation for very large or very small magnitudes.
pub fn format_general(value: f64) -> String {
    if value == 0.0 {
        return "0".into();
    }
    if !value.is_finite() {
        return value.to_string();
    }

    let abs = value.abs();
    if (1e-9..1e11).contains(&abs) {
        #[allow(clippy::cast_possible_truncation)] // log10 of a bounded value
        let magnitude = abs.log10().floor() as i32;
        let decimals = (9 - magnitude).clamp(0, 9);
        #[allow(clippy::cast_sign_loss)] // clamped to 0..=9
        let s = format!("{:.*}", decimals as usize, value);
        return trim_fraction(&s);
    }

    let s = format!("{value:.5E}");
    let Some((mantissa, exponent)) = s.split_once('E') else {
        return s;
    };
    let mantissa = trim_fraction(mantissa);
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}E{sign}{:02}", exponent.abs())
}

fn trim_fraction(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

// ── Numbers ────────────────────────────────────────────────────────

fn format_number(value: f64, section: &str, auto_sign: bool) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let Some((start, end)) = placeholder_span(section) else {
        // No digit placeholders: the section is pure literal text.
        return render_literal(section);
    };

    // Trailing scaling commas belong to the number pattern.
    let mut end = end;
    while section[end..].starts_with(',') {
        end += 1;
    }

    let number_raw = &section[start..end];
    if number_raw.contains('/') {
        // Fractions are not rendered; fall back to General.
        return with_sign(format_general(value.abs()), value, auto_sign);
    }

    let prefix = render_literal(&section[..start]);
    let suffix = render_literal(&section[end..]);

    let percent = count_outside_quotes(section, '%');
    let mut v = value.abs();
    for _ in 0..percent {
        v *= 100.0;
    }

    let body = match split_scientific(number_raw) {
        Some((mantissa, exp_raw)) => format_scientific(v, &parse_fixed(mantissa), exp_raw),
        None => format_fixed(v, &parse_fixed(number_raw)),
    };

    with_sign(format!("{prefix}{body}{suffix}"), value, auto_sign)
}

/// Byte span from the first to the last digit placeholder, skipping quoted
/// text, escapes, padding/fill operands and brackets.
fn placeholder_span(section: &str) -> Option<(usize, usize)> {
    let mut first = None;
    let mut last = None;
    let mut in_quote = false;
    let mut in_bracket = false;
    let mut skip_next = false;

    for (idx, ch) in section.char_indices() {
        if skip_next {
            skip_next = false;
            continue;
        }
        if in_quote {
            in_quote = ch != '"';
            continue;
        }
        if in_bracket {
            in_bracket = ch != ']';
            continue;
        }
        match ch {
            '"' => in_quote = true,
            '[' => in_bracket = true,
            '\\' | '_' | '*' => skip_next = true,
            '0' | '#' | '?' => {
                first.get_or_insert(idx);
                last = Some(idx + ch.len_utf8());
            }
            _ => {}
        }
    }

    first.zip(last)
}

fn count_outside_quotes(section: &str, needle: char) -> usize {
    let mut in_quote = false;
    let mut skip_next = false;
    let mut count = 0;
    for ch in section.chars() {
        if skip_next {
            skip_next = false;
            continue;
        }
        match ch {
            '"' => in_quote = !in_quote,
            '\\' if !in_quote => skip_next = true,
            c if c == needle && !in_quote => count += 1,
            _ => {}
        }
    }
    count
}

/// Render the literal parts of a section: quoted text verbatim, escapes
/// unescaped, `_x` as one space, `*x` dropped, `[$sym-lcid]` as `sym`,
/// other brackets dropped.
fn render_literal(raw: &str) -> String {
    let mut out = String::new();
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => out.extend(chars.by_ref().take_while(|&c| c != '"')),
            '\\' => out.extend(chars.next()),
            '_' => {
                chars.next();
                out.push(' ');
            }
            '*' => {
                chars.next();
            }
            '[' => {
                let inner: String = chars.by_ref().take_while(|&c| c != ']').collect();
                if let Some(currency) = inner.strip_prefix('$') {
                    out.push_str(currency.split('-').next().unwrap_or(""));
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

#[derive(Debug, Clone, Default)]
struct FixedSpec {
    min_int: usize,
    int_placeholders: usize,
    /// `?` placeholders pad with spaces instead of zeros.
    space_int: usize,
    min_frac: usize,
    space_frac: usize,
    max_frac: usize,
    grouping: bool,
    scale_commas: usize,
    has_decimal_point: bool,
}

fn parse_fixed(number_raw: &str) -> FixedSpec {
    let mut raw = number_raw;
    let mut scale_commas = 0;
    while let Some(rest) = raw.strip_suffix(',') {
        raw = rest;
        scale_commas += 1;
    }

    let (int_pat, frac_pat) = match raw.find('.') {
        Some(pos) => (&raw[..pos], &raw[pos + 1..]),
        None => (raw, ""),
    };
    let is_placeholder = |c: &char| matches!(c, '0' | '#' | '?');

    FixedSpec {
        min_int: int_pat.chars().filter(|&c| c == '0').count(),
        int_placeholders: int_pat.chars().filter(is_placeholder).count(),
        space_int: int_pat.chars().filter(|&c| c == '?').count(),
        min_frac: frac_pat.chars().filter(|&c| c == '0').count(),
        space_frac: frac_pat.chars().filter(|&c| c == '?').count(),
        max_frac: frac_pat.chars().filter(is_placeholder).count(),
        grouping: int_pat.contains(','),
        scale_commas,
        has_decimal_point: raw.contains('.'),
    }
}

/// Round half away from zero, the way Excel displays values.
fn round_to(value: f64, decimals: usize) -> f64 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

fn format_fixed(value: f64, spec: &FixedSpec) -> String {
    let mut v = value;
    for _ in 0..spec.scale_commas {
        v /= 1000.0;
    }

    let s = format!("{:.*}", spec.max_frac, round_to(v, spec.max_frac));
    let (int_digits, frac_digits) = s.split_once('.').unwrap_or((s.as_str(), ""));

    let mut int_part = if spec.int_placeholders == 0 || (spec.min_int == 0 && int_digits == "0") {
        String::new()
    } else {
        int_digits.to_string()
    };
    while int_part.len() < spec.min_int {
        int_part.insert(0, '0');
    }
    if spec.grouping {
        int_part = group_thousands(&int_part);
    }
    while int_part.len() < spec.min_int + spec.space_int {
        int_part.insert(0, ' ');
    }

    let mut frac_part = frac_digits.to_string();
    while frac_part.len() > spec.min_frac && frac_part.ends_with('0') {
        frac_part.pop();
    }
    while frac_part.len() < spec.min_frac + spec.space_frac {
        frac_part.push(' ');
    }

    if spec.has_decimal_point {
        format!("{int_part}.{frac_part}")
    } else {
        int_part
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Split `0.00E+00` into the mantissa pattern and the exponent pattern
/// (including its sign character).
fn split_scientific(number_raw: &str) -> Option<(&str, &str)> {
    let pos = number_raw.find(['E', 'e'])?;
    let exp = &number_raw[pos + 1..];
    if exp.starts_with(['+', '-']) {
        Some((&number_raw[..pos], exp))
    } else {
        None
    }
}

fn format_scientific(value: f64, mantissa: &FixedSpec, exp_raw: &str) -> String {
    let always_sign = exp_raw.starts_with('+');
    let exp_digits = exp_raw.chars().filter(|c| matches!(c, '0' | '#' | '?')).count().max(1);
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let group = mantissa.int_placeholders.max(1) as i32;

    let mut exponent = if value == 0.0 {
        0
    } else {
        #[allow(clippy::cast_possible_truncation)]
        let e = value.log10().floor() as i32;
        e.div_euclid(group) * group
    };
    let mut m = if value == 0.0 { 0.0 } else { value / 10f64.powi(exponent) };
    if round_to(m, mantissa.max_frac) >= 10f64.powi(group) {
        exponent += group;
        m /= 10f64.powi(group);
    }

    let spec = FixedSpec {
        min_int: mantissa.min_int.max(1),
        int_placeholders: mantissa.int_placeholders.max(1),
        ..mantissa.clone()
    };
    let body = format_fixed(m, &spec);
    let sign = if exponent < 0 {
        "-"
    } else if always_sign {
        "+"
    } else {
        ""
    };
    format!("{body}E{sign}{:0width$}", exponent.abs(), width = exp_digits)
}

// ── Dates ──────────────────────────────────────────────────────────

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// One lexed piece of a date/time section.
#[derive(Debug, Clone, PartialEq)]
enum DateToken {
    Literal(String),
    Year(usize),
    /// Month or minute; decided after lexing.
    MonthOrMinute(usize),
    Minute(usize),
    Day(usize),
    Hour(usize),
    Second(usize),
    FractionalSeconds(usize),
    ElapsedHours,
    ElapsedMinutes,
    AmPm { short: bool },
}

fn lex_date(section: &str) -> Vec<DateToken> {
    let chars: Vec<char> = section.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let run_len = |i: usize, target: char| {
        chars[i..]
            .iter()
            .take_while(|c| c.to_ascii_lowercase() == target)
            .count()
    };

    while i < chars.len() {
        let ch = chars[i];
        let lower = ch.to_ascii_lowercase();
        match lower {
            '"' => {
                let text: String = chars[i + 1..].iter().take_while(|&&c| c != '"').collect();
                i += text.chars().count() + 2;
                tokens.push(DateToken::Literal(text));
            }
            '\\' => {
                if let Some(&next) = chars.get(i + 1) {
                    tokens.push(DateToken::Literal(next.to_string()));
                }
                i += 2;
            }
            '_' => {
                tokens.push(DateToken::Literal(" ".into()));
                i += 2;
            }
            '*' => i += 2,
            '[' => {
                let inner: String = chars[i + 1..].iter().take_while(|&&c| c != ']').collect();
                i += inner.chars().count() + 2;
                match inner.to_ascii_lowercase().chars().next() {
                    Some('h') if is_elapsed_time_bracket(&inner) => tokens.push(DateToken::ElapsedHours),
                    Some('m') if is_elapsed_time_bracket(&inner) => tokens.push(DateToken::ElapsedMinutes),
                    _ => {}
                }
            }
            'y' | 'm' | 'd' | 'h' | 's' => {
                let n = run_len(i, lower);
                i += n;
                tokens.push(match lower {
                    'y' => DateToken::Year(n),
                    'm' => DateToken::MonthOrMinute(n),
                    'd' => DateToken::Day(n),
                    'h' => DateToken::Hour(n),
                    _ => DateToken::Second(n),
                });
            }
            'a' => {
                let rest: String = chars[i..].iter().take(5).collect::<String>().to_ascii_uppercase();
                if rest.starts_with("AM/PM") {
                    tokens.push(DateToken::AmPm { short: false });
                    i += 5;
                } else if rest.starts_with("A/P") {
                    tokens.push(DateToken::AmPm { short: true });
                    i += 3;
                } else {
                    tokens.push(DateToken::Literal(ch.to_string()));
                    i += 1;
                }
            }
            '.' if matches!(tokens.last(), Some(DateToken::Second(_))) && chars.get(i + 1) == Some(&'0') => {
                let n = run_len(i + 1, '0');
                tokens.push(DateToken::FractionalSeconds(n));
                i += n + 1;
            }
            _ => {
                tokens.push(DateToken::Literal(ch.to_string()));
                i += 1;
            }
        }
    }

    resolve_minutes(&mut tokens);
    tokens
}

/// An `m` run right after an hour or right before a second is a minute.
fn resolve_minutes(tokens: &mut [DateToken]) {
    let is_field = |t: &DateToken| !matches!(t, DateToken::Literal(_));
    for idx in 0..tokens.len() {
        let DateToken::MonthOrMinute(n) = tokens[idx] else {
            continue;
        };
        let prev = tokens[..idx].iter().rev().find(|t| is_field(t));
        let next = tokens[idx + 1..].iter().find(|t| is_field(t));
        let after_hour = matches!(prev, Some(DateToken::Hour(_) | DateToken::ElapsedHours));
        let before_second = matches!(next, Some(DateToken::Second(_)));
        if after_hour || before_second {
            tokens[idx] = DateToken::Minute(n);
        }
    }
}

fn format_date(serial: f64, section: &str) -> String {
    if serial < 0.0 || !serial.is_finite() || serial > 2_958_466.0 {
        return format_fallback(serial);
    }

    let tokens = lex_date(section);
    let twelve_hour = tokens.iter().any(|t| matches!(t, DateToken::AmPm { .. }));

    #[allow(clippy::cast_possible_truncation)] // bounded above
    let mut day_serial = serial.floor() as i64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mut total_ms = ((serial - serial.floor()) * 86_400_000.0).round() as u64;
    if total_ms >= 86_400_000 {
        total_ms -= 86_400_000;
        day_serial += 1;
    }

    // Round to the finest displayed unit: whole seconds unless a fraction
    // field asks for tenths, hundredths or milliseconds.
    let fraction_digits = tokens
        .iter()
        .filter_map(|t| match t {
            DateToken::FractionalSeconds(n) => Some((*n).min(3)),
            _ => None,
        })
        .max()
        .unwrap_or(0);
    #[allow(clippy::cast_possible_truncation)] // fraction_digits <= 3
    let unit = 10u64.pow(3 - fraction_digits as u32);
    total_ms = (total_ms + unit / 2) / unit * unit;
    if total_ms >= 86_400_000 {
        total_ms -= 86_400_000;
        day_serial += 1;
    }

    let (year, month, day) = if day_serial == 0 {
        (1900, 1, 0)
    } else {
        serial_to_ymd(day_serial)
    };
    let elapsed_days = u64::try_from(day_serial).unwrap_or(0);
    let hour = total_ms / 3_600_000;
    let minute = (total_ms % 3_600_000) / 60_000;
    let second = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;

    let mut out = String::new();
    for token in &tokens {
        match token {
            DateToken::Literal(text) => out.push_str(text),
            DateToken::Year(n) if *n <= 2 => out.push_str(&format!("{:02}", year % 100)),
            DateToken::Year(_) => out.push_str(&format!("{year:04}")),
            DateToken::MonthOrMinute(n) => {
                let name = MONTHS[(month as usize).saturating_sub(1) % 12];
                match *n {
                    1 => out.push_str(&month.to_string()),
                    2 => out.push_str(&format!("{month:02}")),
                    3 => out.push_str(&name[..3]),
                    5 => out.push_str(&name[..1]),
                    _ => out.push_str(name),
                }
            }
            DateToken::Minute(n) => push_padded(&mut out, minute, *n),
            DateToken::Day(n) => {
                let weekday = WEEKDAYS[weekday_index(day_serial)];
                match *n {
                    1 => out.push_str(&day.to_string()),
                    2 => out.push_str(&format!("{day:02}")),
                    3 => out.push_str(&weekday[..3]),
                    _ => out.push_str(weekday),
                }
            }
            DateToken::Hour(n) => {
                let h = if twelve_hour {
                    match hour % 12 {
                        0 => 12,
                        h => h,
                    }
                } else {
                    hour
                };
                push_padded(&mut out, h, *n);
            }
            DateToken::Second(n) => push_padded(&mut out, second, *n),
            DateToken::FractionalSeconds(n) => {
                let digits = format!("{millis:03}");
                out.push('.');
                out.push_str(&digits[..(*n).min(3)]);
            }
            DateToken::ElapsedHours => {
                out.push_str(&(elapsed_days * 24 + hour).to_string());
            }
            DateToken::ElapsedMinutes => {
                out.push_str(&((elapsed_days * 24 + hour) * 60 + minute).to_string());
            }
            DateToken::AmPm { short } => {
                let pm = hour >= 12;
                out.push_str(match (short, pm) {
                    (false, false) => "AM",
                    (false, true) => "PM",
                    (true, false) => "A",
                    (true, true) => "P",
                });
            }
        }
    }
    out
}

fn push_padded(out: &mut String, value: u64, width: usize) {
    if width >= 2 {
        out.push_str(&format!("{value:02}"));
    } else {
        out.push_str(&value.to_string());
    }
}

/// 0 = Sunday. Serial 1 (1900-01-01) is a Sunday in Excel's calendar.
fn weekday_index(day_serial: i64) -> usize {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // rem_euclid(7) < 7
    let idx = (day_serial + 6).rem_euclid(7) as usize;
    idx
}

/// Convert an Excel serial number to an ISO 8601 string.
///
/// Returns `YYYY-MM-DD` for whole numbers, `YYYY-MM-DD HH:MM:SS` if
/// there is a fractional (time) component.
///
/// Handles the Lotus 1-2-3 bug: serial 60 is treated as 1900-02-29
/// (which doesn't exist), and serials ≤ 0 or absurdly large values
/// are returned as-is.
pub fn serial_to_iso(serial: f64) -> String {
    if serial < 0.0 || serial.is_nan() || serial.is_infinite() {
        return format_fallback(serial);
    }

    #[allow(clippy::cast_possible_truncation)] // capped at 2_958_465 below
    let day_serial = serial.floor() as i64;
    let frac = serial - serial.floor();

    // Serial 0 is sometimes used as "no date"
    if day_serial == 0 {
        // Pure time value
        if frac > 0.0 {
            return format_time_only(frac);
        }
        return format_fallback(serial);
    }

    // Cap at year 9999 (~2_958_465)
    if day_serial > 2_958_465 {
        return format_fallback(serial);
    }

    let (year, month, day) = serial_to_ymd(day_serial);

    if frac.abs() < 1e-10 {
        format!("{year:04}-{month:02}-{day:02}")
    } else {
        let (hour, min, sec) = frac_to_hms(frac);
        format!("{year:04}-{month:02}-{day:02} {hour:02}:{min:02}:{sec:02}")
    }
}

/// Convert the integer part of a serial to (year, month, day).
///
/// Accounts for the Lotus 1-2-3 leap year bug: serial 60 is treated
/// as 1900-02-29. Serials > 60 are adjusted by -1 to compensate.
fn serial_to_ymd(serial: i64) -> (i32, u32, u32) {
    // Handle the fake 1900-02-29
    if serial == 60 {
        return (1900, 2, 29);
    }

    // Adjust for the Lotus bug: serials after 60 are off by one
    let adjusted = if serial > 60 { serial - 1 } else { serial };

    // Days since 1900-01-01 (0-based: serial 1 → day 0)
    #[allow(clippy::cast_possible_truncation)] // max serial ~3M, fits in i32
    let mut days_remaining = (adjusted - 1) as i32;
    let mut year: i32 = 1900;

    // Advance by years
    loop {
        let days_in_year = if is_leap_year(year) { 366 } else { 365 };
        if days_remaining < days_in_year {
            break;
        }
        days_remaining -= days_in_year;
        year += 1;
    }

    // Advance by months
    let month_days: [i32; 12] = if is_leap_year(year) {
        [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    } else {
        [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    };

    let mut month: u32 = 1;
    for &md in &month_days {
        if days_remaining < md {
            break;
        }
        days_remaining -= md;
        month += 1;
    }

    #[allow(clippy::cast_sign_loss)] // days_remaining >= 0 after the loops
    let day = days_remaining as u32 + 1;
    (year, month, day)
}

/// Check if a year is a leap year in the Gregorian calendar.
const fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Convert the fractional part of a serial to (hour, minute, second).
fn frac_to_hms(frac: f64) -> (u32, u32, u32) {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // frac ∈ [0, 1)
    let total_seconds = (frac * 86400.0).round() as u64;
    let h = (total_seconds / 3600) % 24;
    let m = (total_seconds % 3600) / 60;
    let s = total_seconds % 60;
    #[allow(clippy::cast_possible_truncation)]
    (h as u32, m as u32, s as u32)
}

/// Format a pure time value (serial between 0 and 1).
fn format_time_only(frac: f64) -> String {
    let (h, m, s) = frac_to_hms(frac);
    format!("{h:02}:{m:02}:{s:02}")
}

/// Fallback: format as a number when the serial is out of range.
fn format_fallback(val: f64) -> String {
    if val.fract() == 0.0 && val.abs() < 1e15 {
        #[allow(clippy::cast_possible_truncation)]
        return format!("{}", val as i64);
    }
    val.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(value: f64, format: &str) -> String {
        format_raw_cell_contents(value, 164, Some(format))
    }

    // ── is_date_format_id / is_date_format_string ────────────────

    #[test]
    fn builtin_date_ids() {
        assert!(is_date_format_id(14));
        assert!(is_date_format_id(22));
        assert!(is_date_format_id(45));
        assert!(!is_date_format_id(0));
        assert!(!is_date_format_id(164));
    }

    #[test]
    fn standard_date_format() {
        assert!(is_date_format_string("yyyy-mm-dd"));
        assert!(is_date_format_string("hh:mm:ss"));
        assert!(is_date_format_string("[h]:mm:ss"));
        assert!(is_date_format_string("mm:ss.0"));
    }

    #[test]
    fn number_formats_not_dates() {
        assert!(!is_date_format_string("#,##0.00"));
        assert!(!is_date_format_string("General"));
        assert!(!is_date_format_string("0%"));
        assert!(!is_date_format_string("yyyy-mm-dd #0"));
    }

    #[test]
    fn color_bracket_not_date() {
        // "[Red]" contains a 'd' but is a color code.
        assert!(!is_date_format_string("[Red]0.00"));
        assert!(!is_date_format_string("[Red]General"));
    }

    #[test]
    fn quoted_and_escaped_ignored() {
        assert!(!is_date_format_string("\"day\""));
        assert!(!is_date_format_string("\\d"));
        assert!(is_date_format_string("yyyy\"年\"mm\"月\"dd\"日\""));
    }

    // ── General ──────────────────────────────────────────────────

    #[test]
    fn general_integers_and_decimals() {
        assert_eq!(format_general(42.0), "42");
        assert_eq!(format_general(-3.5), "-3.5");
        assert_eq!(format_general(0.1 + 0.2), "0.3");
        assert_eq!(format_general(0.0), "0");
    }

    #[test]
    fn general_scientific() {
        assert_eq!(format_general(1.5e12), "1.5E+12");
        assert_eq!(format_general(2.0e-10), "2E-10");
    }

    #[test]
    fn general_by_id() {
        assert_eq!(format_raw_cell_contents(12.5, 0, None), "12.5");
    }

    // ── Fixed numbers ────────────────────────────────────────────

    #[test]
    fn fixed_decimals() {
        assert_eq!(fmt(3.14159, "0.00"), "3.14");
        assert_eq!(fmt(2.5, "0"), "3");
        assert_eq!(fmt(0.5, "#.##"), ".5");
        assert_eq!(fmt(7.0, "000"), "007");
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(fmt(1_234_567.891, "#,##0.00"), "1,234,567.89");
        assert_eq!(fmt(999.0, "#,##0"), "999");
        assert_eq!(fmt(1000.0, "#,##0"), "1,000");
    }

    #[test]
    fn scaling_commas() {
        assert_eq!(fmt(1_500_000.0, "#,##0.0,,"), "1.5");
    }

    #[test]
    fn percent() {
        assert_eq!(format_raw_cell_contents(0.256, 9, None), "26%");
        assert_eq!(format_raw_cell_contents(0.256, 10, None), "25.60%");
    }

    #[test]
    fn negative_auto_sign() {
        assert_eq!(fmt(-5.0, "0.0"), "-5.0");
    }

    // ── Currency and sections ────────────────────────────────────

    #[test]
    fn builtin_currency_positive() {
        assert_eq!(format_raw_cell_contents(1234.5, 7, None), "$1,234.50 ");
    }

    #[test]
    fn builtin_currency_negative_section() {
        assert_eq!(format_raw_cell_contents(-1234.5, 7, None), "($1,234.50)");
        assert_eq!(format_raw_cell_contents(-1234.5, 8, None), "($1,234.50)");
    }

    #[test]
    fn explicit_string_wins_over_id() {
        assert_eq!(format_raw_cell_contents(1.0, 2, Some("0.000")), "1.000");
    }

    #[test]
    fn locale_currency_bracket() {
        assert_eq!(fmt(12.0, "[$€-407]#,##0.00"), "€12.00");
    }

    #[test]
    fn zero_section() {
        assert_eq!(fmt(0.0, "0;-0;\"zero\""), "zero");
    }

    #[test]
    fn accounting_zero_dash() {
        assert_eq!(format_raw_cell_contents(0.0, 44, None), " $-   ");
    }

    #[test]
    fn text_section_for_number() {
        assert_eq!(format_raw_cell_contents(5.0, 49, None), "5");
    }

    // ── Scientific ───────────────────────────────────────────────

    #[test]
    fn scientific() {
        assert_eq!(format_raw_cell_contents(12345.0, 11, None), "1.23E+04");
        assert_eq!(fmt(0.00012, "0.0E+00"), "1.2E-04");
        assert_eq!(fmt(0.0, "0.00E+00"), "0.00E+00");
    }

    #[test]
    fn engineering() {
        assert_eq!(format_raw_cell_contents(12345.0, 48, None), "12.3E+3");
    }

    // ── Dates ────────────────────────────────────────────────────

    #[test]
    fn builtin_short_date() {
        assert_eq!(format_raw_cell_contents(45292.0, 14, None), "1/1/24");
        assert_eq!(format_raw_cell_contents(45292.0, 15, None), "1-Jan-24");
        assert_eq!(format_raw_cell_contents(45292.0, 17, None), "Jan-24");
    }

    #[test]
    fn custom_iso_date_time() {
        assert_eq!(fmt(45292.5, "yyyy-mm-dd hh:mm:ss"), "2024-01-01 12:00:00");
    }

    #[test]
    fn twelve_hour_clock() {
        assert_eq!(format_raw_cell_contents(0.75, 18, None), "6:00 PM");
        assert_eq!(fmt(0.0, "h AM/PM"), "12 AM");
    }

    #[test]
    fn long_names() {
        assert_eq!(fmt(45292.0, "dddd, mmmm d, yyyy"), "Monday, January 1, 2024");
    }

    #[test]
    fn elapsed_hours() {
        assert_eq!(format_raw_cell_contents(1.5, 46, None), "36:00:00");
    }

    #[test]
    fn fractional_seconds() {
        assert_eq!(format_raw_cell_contents(0.5 + 0.25 / 86_400.0, 47, None), "00:00.3");
    }

    #[test]
    fn unknown_builtin_date_id_uses_iso() {
        assert_eq!(format_raw_cell_contents(45292.0, 30, None), "2024-01-01");
    }

    // ── serial_to_iso ────────────────────────────────────────────

    #[test]
    fn epoch_and_lotus_bug() {
        assert_eq!(serial_to_iso(1.0), "1900-01-01");
        assert_eq!(serial_to_iso(59.0), "1900-02-28");
        assert_eq!(serial_to_iso(60.0), "1900-02-29");
        assert_eq!(serial_to_iso(61.0), "1900-03-01");
    }

    #[test]
    fn known_dates() {
        assert_eq!(serial_to_iso(36526.0), "2000-01-01");
        assert_eq!(serial_to_iso(45292.25), "2024-01-01 06:00:00");
        assert_eq!(serial_to_iso(2_958_465.0), "9999-12-31");
    }

    #[test]
    fn iso_fallbacks() {
        assert_eq!(serial_to_iso(0.5), "12:00:00");
        assert_eq!(serial_to_iso(-1.0), "-1");
        assert_eq!(serial_to_iso(0.0), "0");
        assert_eq!(serial_to_iso(3_000_000.0), "3000000");
    }

    #[test]
    fn frac_to_hms_bounds() {
        assert_eq!(frac_to_hms(0.0), (0, 0, 0));
        assert_eq!(frac_to_hms(0.5), (12, 0, 0));
        assert_eq!(frac_to_hms(0.999_988_425_925_926), (23, 59, 59));
    }
}
