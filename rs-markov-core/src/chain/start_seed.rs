/// Strategy used to select the starting window when generating text.
///
/// # Variants
/// - `Empty`: start from the all-empty window, i.e. from the way messages
///   begin in the training data.
/// - `Custom(String)`: feed the given text through a fresh window and
///   continue from its last tokens. The seed itself is not part of the output.
/// - `Random`: start from a randomly chosen window already present in the chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StartSeed {
	#[default]
	Empty,
	Custom(String),
	Random,
}

impl StartSeed {
	/// Parses the textual seed form used by callers passing seeds as strings.
	///
	/// Accepted forms (case-insensitive prefix):
	/// - `"none"` or `""` → `Empty`
	/// - `"random"` → `Random`
	/// - `"custom:<text>"` → `Custom(text)`
	///
	/// # Errors
	/// Returns an error for any other form or an empty custom seed.
	pub fn parse(seed: &str) -> Result<Self, String> {
		const CUSTOM: &str = "custom:";

		let seed = seed.trim();
		if seed.is_empty() || seed.eq_ignore_ascii_case("none") {
			return Ok(StartSeed::Empty);
		}
		if seed.eq_ignore_ascii_case("random") {
			return Ok(StartSeed::Random);
		}
		match seed.get(..CUSTOM.len()) {
			Some(prefix) if prefix.eq_ignore_ascii_case(CUSTOM) => {
				let value = seed[CUSTOM.len()..].trim();
				if value.is_empty() {
					Err("Custom seed cannot be empty".to_owned())
				} else {
					Ok(StartSeed::Custom(value.to_owned()))
				}
			}
			_ => Err("Seed must be 'none', 'random' or start with 'custom:'".to_owned()),
		}
	}
}
