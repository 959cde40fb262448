//! TSV label/section export and import.

use crate::state::{Asm, ExportLabel, SectionRecord};

/// Render the export table: one line per section
/// (`name<TAB>0xstart<TAB>0xsize<TAB>flags`), then one per exported
/// label (`name<TAB>0xvalue`). The ELF section flags are only written
/// for the `-E` flavor.
pub fn export_table(sections: &[SectionRecord], exports: &[ExportLabel], elf: bool) -> String {
    let mut out = String::new();
    for sec in sections {
        let flags = match sec.name.as_str() {
            ".text" if elf => "AX",
            ".data" if elf => "WA",
            _ => "",
        };
        out.push_str(&format!(
            "{}\t{:#x}\t{:#x}\t{}\n",
            sec.name,
            sec.start.to_u64(),
            sec.size.to_u64(),
            flags
        ));
    }
    for label in exports {
        out.push_str(&format!("{}\t{:#x}\n", label.name, label.value.to_u64()));
    }
    out
}

/// Read an import file: each line is `section label value`, where the
/// value is any assembly-mode expression.
pub fn import_labels(asm: &mut Asm, text: &str) {
    for line in text.lines() {
        import_line(asm, line);
    }
}

fn import_line(asm: &mut Asm, line: &str) -> bool {
    use crate::lexer::{get_label_word, skipspc};
    let b = line.as_bytes();
    let idx = skipspc(b, 0);
    let (idx, section) = get_label_word(b, idx, &asm.lwordchars);
    let idx = skipspc(b, idx);
    let (idx, label) = get_label_word(b, idx, &asm.lwordchars);
    if label.is_empty() {
        return false;
    }
    let idx = skipspc(b, idx);
    let (end, value) = asm.eval_assembly(b, idx);
    if end == idx {
        return false;
    }
    asm.put_label(&label, value, &section)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::int256::Int256;
    use crate::state::{ExportLabel, SectionRecord};

    #[test]
    fn export_format() {
        let mut asm = Asm::new();
        asm.sections.push(SectionRecord {
            name: ".text".into(),
            start: Int256::ZERO,
            size: Int256::from_u64(0x20),
        });
        asm.sections.push(SectionRecord {
            name: ".data".into(),
            start: Int256::from_u64(0x20),
            size: Int256::from_u64(8),
        });
        asm.exports.push(ExportLabel {
            name: "start".into(),
            value: Int256::from_u64(0x10),
            section: ".text".into(),
        });

        assert_eq!(
            export_table(&asm.sections, &asm.exports, false),
            ".text\t0x0\t0x20\t\n.data\t0x20\t0x8\t\nstart\t0x10\n"
        );
        assert_eq!(
            export_table(&asm.sections, &asm.exports, true),
            ".text\t0x0\t0x20\tAX\n.data\t0x20\t0x8\tWA\nstart\t0x10\n"
        );
    }

    #[test]
    fn import_binds_labels() {
        let mut asm = Asm::new();
        import_labels(&mut asm, ".text start 0x40\n.data buf 0x100+8\n\n");
        assert_eq!(asm.label_value("start"), Int256::from_u64(0x40));
        assert_eq!(asm.label_value("buf"), Int256::from_u64(0x108));
        assert_eq!(asm.label_section("buf"), ".data");
    }

    #[test]
    fn malformed_import_lines_are_skipped() {
        let mut asm = Asm::new();
        import_labels(&mut asm, "onlysection\n");
        assert!(asm.labels.is_empty());
    }
}
