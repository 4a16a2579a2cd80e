use justconfig::error::ConfigError;
use justconfig::item::{MapAction, StringItem};

/// Remove quotes from configuration strings.
pub trait Unquote
where
    Self: Sized,
{
    fn unquote(self) -> Result<StringItem, ConfigError>;
}

/// Split a single configuration value into a list.
pub trait SplitList
where
    Self: Sized,
{
    fn split_list(self) -> Result<StringItem, ConfigError>;
}

fn strip_quotes(value: &str) -> Option<&str> {
    let value = value.trim();
    ['"', '\''].iter().find_map(|quote| {
        value
            .strip_prefix(*quote)
            .and_then(|rest| rest.strip_suffix(*quote))
    })
}

impl Unquote for Result<StringItem, ConfigError> {
    /// Strips one pair of surrounding double or single quotes. Unquoted values are kept as is.
    ///
    /// ```rust
    /// # use justconfig::Config;
    /// # use justconfig::ConfPath;
    /// # use justconfig::item::ValueExtractor;
    /// # use justconfig::sources::defaults::Defaults;
    /// # use mangoleaf::config_processors::Unquote;
    /// #
    /// # let mut conf = Config::default();
    /// # let mut defaults = Defaults::default();
    /// defaults.set(conf.root().push_all(&["data_dir"]), "'data/books'", "source info");
    /// conf.add_source(defaults);
    ///
    /// let value: String = conf.get(ConfPath::from(&["data_dir"])).unquote().value().unwrap();
    ///
    /// assert_eq!(value, "data/books");
    /// ```
    fn unquote(self) -> Result<StringItem, ConfigError> {
        self?.map(|v| match strip_quotes(v) {
            Some(unquoted) => MapAction::Replace(vec![unquoted.to_owned()]),
            None => MapAction::Keep,
        })
    }
}

impl SplitList for Result<StringItem, ConfigError> {
    /// Turns a (possibly quoted) comma separated value like `"1002, 357"` into one value per
    /// element. Empty elements are dropped.
    fn split_list(self) -> Result<StringItem, ConfigError> {
        self?.map(|v| {
            let list = strip_quotes(v).unwrap_or(v);
            MapAction::Replace(
                list.split(',')
                    .map(str::trim)
                    .filter(|element| !element.is_empty())
                    .map(str::to_owned)
                    .collect(),
            )
        })
    }
}
