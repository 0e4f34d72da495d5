//! Code dictionaries, and decoding coded columns into labels.
//!
//! The source data stores categorical fields as small integers. Each family of columns shares
//! one dictionary. Every column is decoded by at most one dictionary, exactly once, straight
//! after loading. A decoded [`Cell::Label`] is never looked up again.
use qu::ick_use::*;

use crate::{
    table::{Cell, Record, Table},
    util,
    ANOTHER_CASE, DISEASE_COLUMNS, HOSPITALIZED, ICU, INTUBATED, NATIONALITY, OUTCOME, PREGNANCY,
    SEX, SPEAKS_NATIVE_LANGUAGE, TOBACCO,
};

pub const YES: &str = "YES";
pub const NO: &str = "NO";

/// A fixed mapping from integer code to label.
#[derive(Debug)]
pub struct CodeDictionary {
    name: &'static str,
    entries: &'static [(i64, &'static str)],
}

impl CodeDictionary {
    const fn new(name: &'static str, entries: &'static [(i64, &'static str)]) -> Self {
        Self { name, entries }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self, code: i64) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, label)| *label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &'static str> {
        self.entries.iter().map(|(_, label)| *label)
    }

    /// Decode a single cell.
    ///
    /// Raw text is read as a number first; anything that isn't a number, or is a code we don't
    /// know, becomes `Missing`. Cells that are already decoded are returned as they are.
    pub fn decode(&self, cell: &Cell) -> Cell {
        match cell {
            Cell::Raw(text) => util::parse_code(text)
                .and_then(|code| self.get(code))
                .map(Cell::Label)
                .unwrap_or(Cell::Missing),
            Cell::Label(_) | Cell::Missing => cell.clone(),
        }
    }
}

pub static SEX_CODES: CodeDictionary =
    CodeDictionary::new("sex", &[(1, "FEMALE"), (2, "MALE"), (99, "UNKNOWN")]);

pub static YES_NO_CODES: CodeDictionary = CodeDictionary::new(
    "yes/no",
    &[
        (1, YES),
        (2, NO),
        (97, "DOES NOT APPLY"),
        (98, "IGNORED"),
        (99, "UNKNOWN"),
    ],
);

pub static OUTCOME_CODES: CodeDictionary = CodeDictionary::new(
    "outcome",
    &[(1, "POSITIVE"), (2, "NEGATIVE"), (97, "PENDING")],
);

pub static NATIONALITY_CODES: CodeDictionary = CodeDictionary::new(
    "nationality",
    &[(1, "MEXICAN"), (2, "FOREIGN"), (97, "UNKNOWN")],
);

/// Shared by every column in [`DISEASE_COLUMNS`].
pub static DISEASE_CODES: CodeDictionary = CodeDictionary::new(
    "disease",
    &[
        (1, YES),
        (2, NO),
        (97, "N/A"),
        (98, "IGNORED"),
        (99, "UNKNOWN"),
    ],
);

/// Columns with their own dictionary. These take precedence over [`DISEASE_CODES`] for columns
/// that are also disease indicators (e.g. TOBACCO).
pub static FIELD_DICTIONARIES: [(&str, &CodeDictionary); 10] = [
    (SEX, &SEX_CODES),
    (HOSPITALIZED, &YES_NO_CODES),
    (INTUBATED, &YES_NO_CODES),
    (PREGNANCY, &YES_NO_CODES),
    (SPEAKS_NATIVE_LANGUAGE, &YES_NO_CODES),
    (TOBACCO, &YES_NO_CODES),
    (ANOTHER_CASE, &YES_NO_CODES),
    (ICU, &YES_NO_CODES),
    (OUTCOME, &OUTCOME_CODES),
    (NATIONALITY, &NATIONALITY_CODES),
];

/// The dictionary that decodes `column`, if there is one.
pub fn dictionary_for(column: &str) -> Option<&'static CodeDictionary> {
    FIELD_DICTIONARIES
        .iter()
        .find(|(name, _)| *name == column)
        .map(|(_, dict)| *dict)
        .or_else(|| DISEASE_COLUMNS.contains(&column).then_some(&DISEASE_CODES))
}

/// Decode every coded column present in `table`.
///
/// Columns without a dictionary are passed through unchanged, as are cells that were already
/// decoded, so normalizing a normalized table changes nothing.
pub fn normalize(table: &Table) -> Table {
    let plan = table
        .column_names()
        .map(dictionary_for)
        .collect::<Vec<_>>();
    let decoded_columns = plan.iter().filter(|dict| dict.is_some()).count();

    let mut lost = 0usize;
    let rows = table
        .iter()
        .map(|record| {
            Record::new(record.iter().zip(plan.iter()).map(|(cell, dict)| match dict {
                Some(dict) => {
                    let decoded = dict.decode(cell);
                    if decoded.is_missing() && !cell.is_missing() {
                        lost += 1;
                    }
                    decoded
                }
                None => cell.clone(),
            }))
        })
        .collect();

    event!(
        Level::INFO,
        "decoded {} coded columns; {} values had no matching code",
        decoded_columns,
        lost
    );
    table.with_rows(rows)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{ASTHMA, DIABETES, PNEUMONIA};

    fn table(csv: &str) -> Table {
        Table::from_csv(csv.as_bytes()).unwrap()
    }

    #[test]
    fn disease_dictionary() {
        let raw = ["1", "2", "97", "98", "99", "3"]
            .into_iter()
            .map(Cell::from_source)
            .chain([Cell::Missing]);
        let decoded = raw.map(|cell| DISEASE_CODES.decode(&cell)).collect::<Vec<_>>();
        assert_eq!(
            decoded,
            vec![
                Cell::Label("YES"),
                Cell::Label("NO"),
                Cell::Label("N/A"),
                Cell::Label("IGNORED"),
                Cell::Label("UNKNOWN"),
                Cell::Missing,
                Cell::Missing,
            ]
        );
    }

    #[test]
    fn non_numeric_is_missing() {
        assert_eq!(SEX_CODES.decode(&Cell::Raw("female".into())), Cell::Missing);
        assert_eq!(SEX_CODES.decode(&Cell::Raw("1.0".into())), Cell::Label("FEMALE"));
    }

    #[test]
    fn precedence() {
        assert_eq!(dictionary_for(TOBACCO).unwrap().name(), "yes/no");
        assert_eq!(dictionary_for(DIABETES).unwrap().name(), "disease");
        assert_eq!(dictionary_for(PNEUMONIA).unwrap().name(), "disease");
        let t = normalize(&table("PNEUMONIA,TOBACCO\n97,97\n"));
        assert_eq!(t[0][0], Cell::Label("N/A"));
        assert_eq!(t[0][1], Cell::Label("DOES NOT APPLY"));
        assert_eq!(dictionary_for(SEX).unwrap().name(), "sex");
        assert!(dictionary_for("AGE").is_none());
    }

    #[test]
    fn decoded_values_come_from_dictionary() {
        let t = normalize(&table(
            "SEX,OUTCOME,NATIONALITY,ICU,DIABETES,AGE\n\
             1,1,1,1,1,40\n\
             2,2,2,2,2,x\n\
             99,97,97,97,97,\n\
             5,4,3,abc,100,12\n\
             ,,,,,3\n",
        ));
        for name in ["SEX", "OUTCOME", "NATIONALITY", "ICU", "DIABETES"] {
            let dict = dictionary_for(name).unwrap();
            for cell in t.column(name).unwrap() {
                match cell {
                    Cell::Label(label) => assert!(dict.labels().any(|l| l == *label)),
                    Cell::Missing => (),
                    Cell::Raw(text) => panic!("{} left undecoded in {}", text, name),
                }
            }
            // row 4 has codes outside every dictionary
            assert_eq!(t[3][t.column_index(name).unwrap()], Cell::Missing);
        }
        // uncoded columns pass through
        assert_eq!(
            t.column("AGE").unwrap().cloned().collect::<Vec<_>>(),
            vec![
                Cell::Raw("40".into()),
                Cell::Raw("x".into()),
                Cell::Missing,
                Cell::Raw("12".into()),
                Cell::Raw("3".into()),
            ]
        );
    }

    #[test]
    fn normalizing_twice_changes_nothing() {
        let once = normalize(&table(
            "SEX,TOBACCO,ASTHMA,NATIONALITY\n1,1,2,1\n2,97,1,2\n99,3,,97\n",
        ));
        let twice = normalize(&once);
        assert_eq!(&*once, &*twice);
        assert_eq!(once[1][once.column_index(TOBACCO).unwrap()], Cell::Label("DOES NOT APPLY"));
        assert_eq!(once[0][once.column_index(ASTHMA).unwrap()], Cell::Label("NO"));
    }

    #[test]
    fn absent_columns_are_skipped() {
        let t = normalize(&table("SEX\n2\n"));
        assert_eq!(t[0][0], Cell::Label("MALE"));
    }
}
