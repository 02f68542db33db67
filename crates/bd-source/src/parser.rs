use bd_core::Sample;
use chrono::{NaiveDateTime, TimeDelta};

/// Préfixes des messages de service émis par le firmware ESP32.
pub const CONTROL_PREFIXES: &[&str] = &["RSSI_COLLECTOR_START", "Format:", "ERROR:", "E ("];

/// Diagnostic Wi-Fi répété par le firmware, ignoré où qu'il apparaisse.
pub const CONTROL_SUBSTRINGS: &[&str] = &["wifi:failed to post WiFi event"];

/// Résultat du décodage d'une ligne. Aucune ligne ne produit d'erreur.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineOutcome {
    /// Mesure valide.
    Sample(Sample),
    /// Bannière ou log du firmware.
    Control,
    /// Ligne illisible, abandonnée silencieusement.
    Malformed,
    /// Ligne vide après trim.
    Empty,
}

/// Compteurs de décodage d'un cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub samples: usize,
    pub control: usize,
    pub malformed: usize,
    pub empty: usize,
}

impl ParseStats {
    pub fn record(&mut self, outcome: &LineOutcome) {
        match outcome {
            LineOutcome::Sample(_) => self.samples += 1,
            LineOutcome::Control => self.control += 1,
            LineOutcome::Malformed => self.malformed += 1,
            LineOutcome::Empty => self.empty += 1,
        }
    }

    #[must_use]
    pub fn lines(&self) -> usize {
        self.samples + self.control + self.malformed + self.empty
    }
}

fn is_control(line: &str) -> bool {
    CONTROL_PREFIXES.iter().any(|p| line.starts_with(p))
        || CONTROL_SUBSTRINGS.iter().any(|s| line.contains(s))
}

/// Décode une ligne du collecteur.
///
/// - `<ms>,<rssi>` : horodatage = `cycle_start + ms`. Si l'offset est
///   illisible (ou hors calendrier) on retombe sur `now`, mais le RSSI doit
///   rester un entier.
/// - `<rssi>` : ancien format, horodatage = `now`.
///
/// # Example
/// ```
/// use bd_source::parser::{parse_line, LineOutcome};
/// use chrono::NaiveDate;
/// let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
/// match parse_line("1500,-61", start, start) {
///     LineOutcome::Sample(s) => {
///         assert_eq!(s.rssi, -61);
///         assert_eq!((s.timestamp - start).num_milliseconds(), 1500);
///     }
///     other => panic!("unexpected {other:?}"),
/// }
/// assert_eq!(parse_line("Format: ms,rssi", start, start), LineOutcome::Control);
/// ```
#[must_use]
pub fn parse_line(line: &str, cycle_start: NaiveDateTime, now: NaiveDateTime) -> LineOutcome {
    let line = line.trim();
    if line.is_empty() {
        return LineOutcome::Empty;
    }
    if is_control(line) {
        return LineOutcome::Control;
    }

    if line.contains(',') {
        let mut parts = line.split(',');
        let (Some(offset), Some(rssi), None) = (parts.next(), parts.next(), parts.next()) else {
            return LineOutcome::Malformed;
        };
        let timestamp = offset
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .and_then(|delta| cycle_start.checked_add_signed(delta))
            .unwrap_or(now);
        match rssi.trim().parse::<i32>() {
            Ok(rssi) => LineOutcome::Sample(Sample::new(timestamp, rssi)),
            Err(_) => LineOutcome::Malformed,
        }
    } else {
        match line.parse::<i32>() {
            Ok(rssi) => LineOutcome::Sample(Sample::new(now, rssi)),
            Err(_) => LineOutcome::Malformed,
        }
    }
}

/// Parseur d'un cycle : mémorise l'origine des offsets et compte les rejets.
pub struct LineParser {
    cycle_start: NaiveDateTime,
    stats: ParseStats,
}

impl LineParser {
    #[must_use]
    pub fn new(cycle_start: NaiveDateTime) -> Self {
        Self {
            cycle_start,
            stats: ParseStats::default(),
        }
    }

    /// Décode `line` et retourne la mesure s'il y en a une.
    pub fn feed(&mut self, line: &str, now: NaiveDateTime) -> Option<Sample> {
        let outcome = parse_line(line, self.cycle_start, now);
        self.stats.record(&outcome);
        match outcome {
            LineOutcome::Sample(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn cycle_start(&self) -> NaiveDateTime {
        self.cycle_start
    }

    #[must_use]
    pub fn stats(&self) -> ParseStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn now() -> NaiveDateTime {
        start() + TimeDelta::seconds(42)
    }

    #[test]
    fn control_lines_are_ignored() {
        for line in [
            "RSSI_COLLECTOR_START v2",
            "Format: timestamp_ms,rssi",
            "ERROR: sniffer init",
            "E (1234) wifi: something",
            "I (99) wifi:failed to post WiFi event=7 ret=-1",
        ] {
            assert_eq!(parse_line(line, start(), now()), LineOutcome::Control, "{line}");
        }
    }

    #[test]
    fn timestamped_line_uses_cycle_offset() {
        let LineOutcome::Sample(s) = parse_line(" 2500 , -70 ", start(), now()) else {
            panic!("expected a sample");
        };
        assert_eq!(s.rssi, -70);
        assert_eq!(s.timestamp, start() + TimeDelta::milliseconds(2500));
    }

    #[test]
    fn bad_offset_falls_back_to_now() {
        let LineOutcome::Sample(s) = parse_line("abc,-55", start(), now()) else {
            panic!("expected a sample");
        };
        assert_eq!(s.timestamp, now());
        assert_eq!(s.rssi, -55);
    }

    #[test]
    fn overflowing_offset_falls_back_to_now() {
        let line = format!("{},-55", i64::MAX);
        let LineOutcome::Sample(s) = parse_line(&line, start(), now()) else {
            panic!("expected a sample");
        };
        assert_eq!(s.timestamp, now());
    }

    #[test]
    fn bad_rssi_drops_the_line() {
        assert_eq!(parse_line("1000,strong", start(), now()), LineOutcome::Malformed);
        assert_eq!(parse_line("1000,", start(), now()), LineOutcome::Malformed);
    }

    #[test]
    fn wrong_field_count_is_malformed() {
        assert_eq!(parse_line("1,2,3", start(), now()), LineOutcome::Malformed);
        assert_eq!(parse_line(",", start(), now()), LineOutcome::Malformed);
    }

    #[test]
    fn legacy_bare_rssi() {
        assert_eq!(
            parse_line("-67", start(), now()),
            LineOutcome::Sample(Sample::new(now(), -67))
        );
        assert_eq!(parse_line("-67dBm", start(), now()), LineOutcome::Malformed);
    }

    #[test]
    fn parser_counts_every_outcome() {
        let mut parser = LineParser::new(start());
        let lines = ["RSSI_COLLECTOR_START", "", "10,-50", "garbage", "-60", "x,y"];
        let parsed: Vec<Sample> = lines.iter().filter_map(|l| parser.feed(l, now())).collect();
        assert_eq!(parsed.len(), 2);
        let stats = parser.stats();
        assert_eq!(stats.samples, 2);
        assert_eq!(stats.control, 1);
        assert_eq!(stats.empty, 1);
        assert_eq!(stats.malformed, 2);
        assert_eq!(stats.lines(), lines.len());
    }
}
