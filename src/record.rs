//! Entry record shared by the index, the store and the wire layer

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::trie::Frequency;

/// One selectable candidate: the code typed to reach it, the word it
/// produces, and how often it is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    pub code: String,
    /// Word or phrase produced by the code (the store calls this `word`).
    #[serde(alias = "word")]
    pub name: String,
    #[serde(alias = "freq")]
    pub frequency: Frequency,
}

impl Record {
    pub fn new(code: impl Into<String>, name: impl Into<String>, frequency: Frequency) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            frequency,
        }
    }

    /// Parse one `code<TAB>word<TAB>frequency` line.
    pub fn parse_tsv(line: &str) -> Result<Self> {
        let mut fields = line.split('\t');
        let (Some(code), Some(name), Some(freq), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(IndexError::InvalidRecord(format!(
                "expected 3 tab-separated fields: {:?}",
                line
            )));
        };

        let code = code.trim();
        if code.is_empty() {
            return Err(IndexError::InvalidRecord(format!("empty code: {:?}", line)));
        }
        let frequency = freq.trim().parse::<Frequency>().map_err(|e| {
            IndexError::InvalidRecord(format!("bad frequency {:?}: {}", freq, e))
        })?;

        Ok(Self::new(code, name.trim(), frequency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tsv() {
        let r = Record::parse_tsv("haoye\t好耶\t50").unwrap();
        assert_eq!(r, Record::new("haoye", "好耶", 50));
    }

    #[test]
    fn test_parse_tsv_rejects_bad_lines() {
        assert!(Record::parse_tsv("hao\t好").is_err());
        assert!(Record::parse_tsv("hao\t好\t1\textra").is_err());
        assert!(Record::parse_tsv("\t好\t1").is_err());
        assert!(Record::parse_tsv("hao\t好\t-1").is_err());
    }

    #[test]
    fn test_store_field_aliases() {
        let r: Record = serde_json::from_str(r#"{"code":"he","word":"和","freq":10}"#).unwrap();
        assert_eq!(r, Record::new("he", "和", 10));
    }
}
