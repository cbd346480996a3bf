//! Typed filter graph.
//!
//! Every composition stage appends inputs and filter chains here. The
//! graph stays structured until the emitter serializes it into the
//! encoder's directive syntax.

use serde::{Deserialize, Serialize};

/// Stream type selected from a numbered input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Video,
    Audio,
}

/// A connection point between chains.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pad {
    /// A stream of a numbered input (`[3:v]`).
    Input { index: usize, stream: StreamKind },
    /// A named intermediate stream (`[vMerged]`).
    Label(String),
}

impl Pad {
    pub fn video(index: usize) -> Self {
        Pad::Input {
            index,
            stream: StreamKind::Video,
        }
    }

    pub fn audio(index: usize) -> Self {
        Pad::Input {
            index,
            stream: StreamKind::Audio,
        }
    }

    pub fn label(name: impl Into<String>) -> Self {
        Pad::Label(name.into())
    }

    /// Label name, for named pads.
    pub fn name(&self) -> Option<&str> {
        match self {
            Pad::Label(name) => Some(name),
            Pad::Input { .. } => None,
        }
    }
}

/// One filter argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterArg {
    Positional(String),
    Named(String, String),
}

/// A single filter with its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,
    pub args: Vec<FilterArg>,
}

impl Filter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: vec![],
        }
    }

    pub fn arg(mut self, value: impl ToString) -> Self {
        self.args.push(FilterArg::Positional(value.to_string()));
        self
    }

    pub fn named(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.args.push(FilterArg::Named(key.into(), value.to_string()));
        self
    }

    /// Value of a named argument.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.args.iter().find_map(|arg| match arg {
            FilterArg::Named(k, v) if k == key => Some(v.as_str()),
            _ => None,
        })
    }

    /// Parse a comma-separated chain such as `eq=contrast=1.1,curves=vintage`.
    ///
    /// Quoted values are not supported; template grades never need them.
    pub fn parse_chain(expression: &str) -> Vec<Filter> {
        expression
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| match part.split_once('=') {
                None => Filter::new(part),
                Some((name, rest)) => {
                    let mut filter = Filter::new(name);
                    for arg in rest.split(':') {
                        filter = match arg.split_once('=') {
                            Some((k, v)) => filter.named(k, v),
                            None => filter.arg(arg),
                        };
                    }
                    filter
                }
            })
            .collect()
    }
}

/// A linear run of filters between input pads and one output pad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterChain {
    pub inputs: Vec<Pad>,
    pub filters: Vec<Filter>,
    pub output: Pad,
}

impl FilterChain {
    pub fn new(inputs: Vec<Pad>, filters: Vec<Filter>, output: Pad) -> Self {
        Self {
            inputs,
            filters,
            output,
        }
    }

    /// First filter with the given name.
    pub fn find(&self, name: &str) -> Option<&Filter> {
        self.filters.iter().find(|f| f.name == name)
    }
}

/// A numbered encoder input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum InputSource {
    /// Still image repeated for `hold_secs`.
    LoopedImage { path: String, hold_secs: f64 },
    /// Still image read once (a single frame).
    Image { path: String },
    /// Any audio or video file read as-is.
    Media { path: String },
    /// Generated silence.
    SilentAudio { duration_secs: f64, sample_rate: u32 },
}

impl InputSource {
    /// Filesystem path or URL, for file-backed inputs.
    pub fn path(&self) -> Option<&str> {
        match self {
            InputSource::LoopedImage { path, .. }
            | InputSource::Image { path }
            | InputSource::Media { path } => Some(path),
            InputSource::SilentAudio { .. } => None,
        }
    }
}

/// Inputs plus the chains connecting them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterGraph {
    pub inputs: Vec<InputSource>,
    pub chains: Vec<FilterChain>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an input and return its index.
    pub fn add_input(&mut self, source: InputSource) -> usize {
        self.inputs.push(source);
        self.inputs.len() - 1
    }

    pub fn push(&mut self, chain: FilterChain) {
        self.chains.push(chain);
    }

    /// The chain whose output is the given label.
    pub fn producer(&self, label: &str) -> Option<&FilterChain> {
        self.chains.iter().find(|c| c.output.name() == Some(label))
    }

    /// Labels consumed by more than one chain. Must be empty for a valid graph.
    pub fn reused_labels(&self) -> Vec<String> {
        let mut seen = std::collections::BTreeMap::<&str, usize>::new();
        for pad in self.chains.iter().flat_map(|c| c.inputs.iter()) {
            if let Some(name) = pad.name() {
                *seen.entry(name).or_default() += 1;
            }
        }
        seen.into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(name, _)| name.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chain_with_named_and_positional_args() {
        let filters = Filter::parse_chain("eq=contrast=1.1:saturation=1.2,curves=vintage");
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].name, "eq");
        assert_eq!(filters[0].get("contrast"), Some("1.1"));
        assert_eq!(filters[0].get("saturation"), Some("1.2"));
        assert_eq!(filters[1].name, "curves");
        assert_eq!(filters[1].args, vec![FilterArg::Positional("vintage".into())]);
    }

    #[test]
    fn test_parse_chain_bare_filter() {
        let filters = Filter::parse_chain("null");
        assert_eq!(filters, vec![Filter::new("null")]);
        assert!(Filter::parse_chain("").is_empty());
    }

    #[test]
    fn test_add_input_returns_sequential_indices() {
        let mut graph = FilterGraph::new();
        let a = graph.add_input(InputSource::Image {
            path: "a.jpg".into(),
        });
        let b = graph.add_input(InputSource::SilentAudio {
            duration_secs: 3.0,
            sample_rate: 44_100,
        });
        assert_eq!((a, b), (0, 1));
        assert_eq!(graph.inputs[0].path(), Some("a.jpg"));
        assert_eq!(graph.inputs[1].path(), None);
    }

    #[test]
    fn test_reused_labels_detected() {
        let mut graph = FilterGraph::new();
        graph.push(FilterChain::new(
            vec![Pad::label("x")],
            vec![Filter::new("null")],
            Pad::label("y"),
        ));
        graph.push(FilterChain::new(
            vec![Pad::label("x")],
            vec![Filter::new("null")],
            Pad::label("z"),
        ));
        assert_eq!(graph.reused_labels(), vec!["x".to_string()]);
        assert!(graph.producer("z").is_some());
    }
}
