use std::{fmt, str::FromStr};

use crate::engine::{MapFn, ReduceFn};
use crate::{indexer, wordcount};

/// Bundled map/reduce applications, selectable by name on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum App {
    #[default]
    WordCount,
    Indexer,
}

impl App {
    pub fn callbacks(self) -> (MapFn, ReduceFn) {
        match self {
            App::WordCount => (wordcount::map, wordcount::reduce),
            App::Indexer => (indexer::map, indexer::reduce),
        }
    }
}

impl FromStr for App {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wc" | "wordcount" => Ok(App::WordCount),
            "indexer" => Ok(App::Indexer),
            other => Err(format!("unknown app '{}' (expected wc or indexer)", other)),
        }
    }
}

impl fmt::Display for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            App::WordCount => f.write_str("wc"),
            App::Indexer => f.write_str("indexer"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apps_parse_from_their_short_names() {
        assert_eq!("wc".parse::<App>().unwrap(), App::WordCount);
        assert_eq!("indexer".parse::<App>().unwrap(), App::Indexer);
        assert!("grep".parse::<App>().is_err());
        assert_eq!(App::Indexer.to_string().parse::<App>().unwrap(), App::Indexer);
    }
}
