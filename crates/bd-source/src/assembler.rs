/// Accumule les octets reçus et découpe les lignes complètes (`\n`).
///
/// Les octets invalides en UTF-8 sont remplacés, les lignes sont trimées
/// et les lignes vides ignorées.
///
/// # Example
/// ```
/// use bd_source::assembler::LineAssembler;
/// let mut asm = LineAssembler::default();
/// let mut lines = Vec::new();
/// asm.push(b"100,-60\r\n200,");
/// asm.drain_lines(&mut lines);
/// assert_eq!(lines, vec!["100,-60".to_string()]);
/// asm.push(b"-61\n");
/// asm.drain_lines(&mut lines);
/// assert_eq!(lines.last().map(String::as_str), Some("200,-61"));
/// ```
#[derive(Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Appends every completed line to `out`. The trailing partial line
    /// stays buffered.
    pub fn drain_lines(&mut self, out: &mut Vec<String>) {
        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return;
        };
        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);
        for raw in complete.split(|&b| b == b'\n') {
            let line = String::from_utf8_lossy(raw);
            let line = line.trim();
            if !line.is_empty() {
                out.push(line.to_string());
            }
        }
    }

    /// Octets en attente d'un `\n`.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop the partial line and return how many bytes were lost.
    pub fn discard_partial(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_across_chunks() {
        let mut asm = LineAssembler::default();
        let mut lines = Vec::new();
        for chunk in [&b"10,-5"[..], b"0\n20,-51\n\n", b"30", b",-52\n"] {
            asm.push(chunk);
            asm.drain_lines(&mut lines);
        }
        assert_eq!(lines, vec!["10,-50", "20,-51", "30,-52"]);
        assert_eq!(asm.pending_len(), 0);
    }

    #[test]
    fn partial_line_is_kept_until_discarded() {
        let mut asm = LineAssembler::default();
        let mut lines = Vec::new();
        asm.push(b"40,-6");
        asm.drain_lines(&mut lines);
        assert!(lines.is_empty());
        assert_eq!(asm.discard_partial(), 5);
        assert_eq!(asm.pending_len(), 0);
    }

    #[test]
    fn invalid_utf8_does_not_poison_the_stream() {
        let mut asm = LineAssembler::default();
        let mut lines = Vec::new();
        asm.push(&[0xff, 0xfe, b'\n']);
        asm.push(b"-70\n");
        asm.drain_lines(&mut lines);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "-70");
    }
}
