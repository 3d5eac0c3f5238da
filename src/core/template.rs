/// Instruction templates — placeholder parsing, substitution and tone framing.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::schema::profile::PersonalityProfile;
use crate::schema::quest::{QuestOrigin, QuestResult, QuestTemplate};

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// A slot that gets a random concrete value at instantiation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Placeholder {
    Color,
    Object,
    Number,
}

impl Placeholder {
    pub const ALL: [Placeholder; 3] = [Self::Color, Self::Object, Self::Number];

    /// Token name as written between brackets: `[COLOR]` → "COLOR".
    pub fn token(&self) -> &'static str {
        match self {
            Self::Color => "COLOR",
            Self::Object => "OBJECT",
            Self::Number => "NUMBER",
        }
    }

    /// Name of the `ReplacementTable` list that feeds this placeholder.
    pub fn table_field(&self) -> &'static str {
        match self {
            Self::Color => "colors",
            Self::Object => "objects",
            Self::Number => "numbers",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.token() == token)
    }
}

/// A segment of a parsed instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplateSegment {
    /// Literal text, emitted as-is.
    Literal(String),
    /// A known placeholder: `[COLOR]`, `[OBJECT]`, `[NUMBER]`.
    Placeholder(Placeholder),
    /// A bracketed upper-case token with no replacement table,
    /// e.g. `[ANIMAL]`. Emitted verbatim.
    Unresolved(String),
}

/// A parsed instruction: literal text interleaved with placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub segments: Vec<TemplateSegment>,
}

impl Template {
    /// Parse instruction text into segments.
    ///
    /// A token is `[` + upper-case letters, digits or `_` (starting with a
    /// letter) + `]`. Any other bracketed text is literal, so prose such as
    /// "[optional]" passes through untouched.
    pub fn parse(input: &str) -> Template {
        let mut segments = Vec::new();
        let mut literal_buf = String::new();
        let mut rest = input;

        while let Some(open) = rest.find('[') {
            literal_buf.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            match after.find(']') {
                Some(close) if is_token(&after[..close]) => {
                    if !literal_buf.is_empty() {
                        segments.push(TemplateSegment::Literal(std::mem::take(&mut literal_buf)));
                    }
                    let token = &after[..close];
                    segments.push(match Placeholder::from_token(token) {
                        Some(p) => TemplateSegment::Placeholder(p),
                        None => TemplateSegment::Unresolved(token.to_string()),
                    });
                    rest = &after[close + 1..];
                }
                _ => {
                    literal_buf.push('[');
                    rest = after;
                }
            }
        }

        literal_buf.push_str(rest);
        if !literal_buf.is_empty() {
            segments.push(TemplateSegment::Literal(literal_buf));
        }

        Template { segments }
    }

    /// Placeholders in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = Placeholder> + '_ {
        self.segments.iter().filter_map(|s| match s {
            TemplateSegment::Placeholder(p) => Some(*p),
            _ => None,
        })
    }

    /// Tokens that no replacement table knows about.
    pub fn unresolved(&self) -> impl Iterator<Item = &str> + '_ {
        self.segments.iter().filter_map(|s| match s {
            TemplateSegment::Unresolved(token) => Some(token.as_str()),
            _ => None,
        })
    }

    /// The original instruction text.
    pub fn source(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                TemplateSegment::Literal(text) => out.push_str(text),
                TemplateSegment::Placeholder(p) => {
                    out.push('[');
                    out.push_str(p.token());
                    out.push(']');
                }
                TemplateSegment::Unresolved(token) => {
                    out.push('[');
                    out.push_str(token);
                    out.push(']');
                }
            }
        }
        out
    }

    /// Resolve every placeholder with a uniform draw from `table`.
    ///
    /// A placeholder whose value list is empty stays as its token.
    pub fn render<R: Rng + ?Sized>(&self, table: &ReplacementTable, rng: &mut R) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                TemplateSegment::Literal(text) => out.push_str(text),
                TemplateSegment::Placeholder(p) => match table.draw(*p, rng) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('[');
                        out.push_str(p.token());
                        out.push(']');
                    }
                },
                TemplateSegment::Unresolved(token) => {
                    out.push('[');
                    out.push_str(token);
                    out.push(']');
                }
            }
        }
        out
    }
}

fn is_token(content: &str) -> bool {
    let mut chars = content.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {
            chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        }
        _ => false,
    }
}

/// Concrete values drawn for each placeholder kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplacementTable {
    pub colors: Vec<String>,
    pub objects: Vec<String>,
    pub numbers: Vec<u32>,
}

impl Default for ReplacementTable {
    fn default() -> Self {
        Self {
            colors: ["red", "blue", "yellow", "green", "white", "wooden"]
                .into_iter()
                .map(String::from)
                .collect(),
            objects: ["everyday items", "desk ornaments", "pens", "gadgets"]
                .into_iter()
                .map(String::from)
                .collect(),
            numbers: vec![100, 200, 50, 77],
        }
    }
}

impl ReplacementTable {
    pub fn load_from_ron(path: &Path) -> Result<ReplacementTable, TemplateError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<ReplacementTable, TemplateError> {
        Ok(ron::from_str(input)?)
    }

    /// Number of values available for a placeholder kind.
    pub fn len_of(&self, placeholder: Placeholder) -> usize {
        match placeholder {
            Placeholder::Color => self.colors.len(),
            Placeholder::Object => self.objects.len(),
            Placeholder::Number => self.numbers.len(),
        }
    }

    pub fn draw<R: Rng + ?Sized>(&self, placeholder: Placeholder, rng: &mut R) -> Option<String> {
        match placeholder {
            Placeholder::Color => self.colors.choose(rng).cloned(),
            Placeholder::Object => self.objects.choose(rng).cloned(),
            Placeholder::Number => self.numbers.choose(rng).map(|n| n.to_string()),
        }
    }
}

/// Title framing picked from the thinking/feeling axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToneFraming {
    EfficientRecovery,
    Mindfulness,
}

impl ToneFraming {
    pub fn for_profile(profile: &PersonalityProfile) -> Self {
        if profile.thinking {
            Self::EfficientRecovery
        } else {
            Self::Mindfulness
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::EfficientRecovery => "[Efficient Recovery]",
            Self::Mindfulness => "[Mindfulness]",
        }
    }

    pub fn apply(&self, title: &str) -> String {
        format!("{} {}", self.tag(), title)
    }
}

/// Turn a catalog template into a concrete quest for this profile.
pub fn instantiate<R: Rng + ?Sized>(
    template: &QuestTemplate,
    profile: &PersonalityProfile,
    table: &ReplacementTable,
    rng: &mut R,
) -> QuestResult {
    QuestResult {
        origin: QuestOrigin::Catalog(template.id.clone()),
        title: ToneFraming::for_profile(profile).apply(&template.title),
        instruction: template.instruction.render(table, rng),
        encouragement: template.encouragement.clone(),
        rationale: template.rationale.clone(),
        tag: template.tag.clone(),
        quest_type: template.quest_type.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::mood::{CategoryScope, MoodCategory};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn make_template(instruction: &str) -> QuestTemplate {
        QuestTemplate {
            id: "a2".to_string(),
            scope: CategoryScope::Only(MoodCategory::LowEnergy),
            title: "Dust hunt".to_string(),
            instruction: Template::parse(instruction),
            encouragement: "A tidier space feels lighter.".to_string(),
            rationale: "Quick wins trigger the reward system.".to_string(),
            tag: "Achievement".to_string(),
            quest_type: "movement".to_string(),
        }
    }

    #[test]
    fn parse_literal_only() {
        let t = Template::parse("Take three deep breaths.");
        assert_eq!(
            t.segments,
            vec![TemplateSegment::Literal("Take three deep breaths.".to_string())]
        );
    }

    #[test]
    fn parse_placeholders() {
        let t = Template::parse("Find five [COLOR] things near the [OBJECT].");
        assert_eq!(t.segments.len(), 5);
        assert_eq!(t.segments[1], TemplateSegment::Placeholder(Placeholder::Color));
        assert_eq!(t.segments[3], TemplateSegment::Placeholder(Placeholder::Object));
        assert_eq!(
            t.placeholders().collect::<Vec<_>>(),
            vec![Placeholder::Color, Placeholder::Object]
        );
    }

    #[test]
    fn parse_leading_and_trailing_tokens() {
        let t = Template::parse("[NUMBER] minus seven, three times [NUMBER]");
        assert_eq!(t.segments[0], TemplateSegment::Placeholder(Placeholder::Number));
        assert_eq!(
            t.segments.last(),
            Some(&TemplateSegment::Placeholder(Placeholder::Number))
        );
    }

    #[test]
    fn parse_unknown_token_is_unresolved() {
        let t = Template::parse("Pet the nearest [ANIMAL].");
        assert_eq!(t.unresolved().collect::<Vec<_>>(), vec!["ANIMAL"]);
    }

    #[test]
    fn parse_non_token_brackets_are_literal() {
        for input in ["Say [hello] out loud.", "Unclosed [COLOR here", "Empty [] pair", "[9LIVES]"] {
            let t = Template::parse(input);
            assert_eq!(t.segments, vec![TemplateSegment::Literal(input.to_string())]);
        }
    }

    #[test]
    fn source_round_trips() {
        let text = "Stare at the farthest [OBJECT] for 20 seconds [X_1] [note].";
        assert_eq!(Template::parse(text).source(), text);
    }

    #[test]
    fn render_resolves_all_known_tokens() {
        let t = Template::parse("[COLOR] [OBJECT] [NUMBER]");
        let table = ReplacementTable::default();
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let out = t.render(&table, &mut rng);
            assert!(!out.contains('['), "unresolved output: {}", out);
        }
    }

    #[test]
    fn render_is_deterministic_per_seed() {
        let t = Template::parse("Pick up [NUMBER] pieces of [COLOR] litter.");
        let table = ReplacementTable::default();
        let a = t.render(&table, &mut StdRng::seed_from_u64(7));
        let b = t.render(&table, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn render_draws_from_table() {
        let t = Template::parse("Count [NUMBER] steps.");
        let table = ReplacementTable {
            colors: vec![],
            objects: vec![],
            numbers: vec![12],
        };
        let out = t.render(&table, &mut StdRng::seed_from_u64(1));
        assert_eq!(out, "Count 12 steps.");
    }

    #[test]
    fn render_keeps_token_when_table_is_empty() {
        let t = Template::parse("Find something [COLOR].");
        let table = ReplacementTable {
            colors: vec![],
            ..ReplacementTable::default()
        };
        let out = t.render(&table, &mut StdRng::seed_from_u64(1));
        assert_eq!(out, "Find something [COLOR].");
    }

    #[test]
    fn tone_follows_thinking_axis() {
        let thinker = PersonalityProfile::new(true, true, true, true);
        let feeler = PersonalityProfile::new(true, true, false, true);
        assert_eq!(ToneFraming::for_profile(&thinker), ToneFraming::EfficientRecovery);
        assert_eq!(ToneFraming::for_profile(&feeler), ToneFraming::Mindfulness);
        assert_eq!(
            ToneFraming::EfficientRecovery.apply("Dust hunt"),
            "[Efficient Recovery] Dust hunt"
        );
    }

    #[test]
    fn instantiate_catalog_quest() {
        let template = make_template("Throw away just [NUMBER] tiny bits of trash.");
        let profile = PersonalityProfile::new(false, false, false, false);
        let mut rng = StdRng::seed_from_u64(3);
        let quest = instantiate(&template, &profile, &ReplacementTable::default(), &mut rng);

        assert_eq!(quest.origin, QuestOrigin::Catalog("a2".to_string()));
        assert!(!quest.is_ai_generated());
        assert_eq!(quest.title, "[Mindfulness] Dust hunt");
        assert!(!quest.instruction.contains("[NUMBER]"));
        assert_eq!(quest.tag, "Achievement");
        assert_eq!(quest.quest_type, "movement");
    }

    #[test]
    fn instantiate_twice_stays_well_formed() {
        let template = make_template("Move [NUMBER] [OBJECT] that are [COLOR].");
        let profile = PersonalityProfile::default();
        let table = ReplacementTable::default();
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..2 {
            let quest = instantiate(&template, &profile, &table, &mut rng);
            for p in Placeholder::ALL {
                assert!(!quest.instruction.contains(&format!("[{}]", p.token())));
            }
        }
        // the template itself is untouched
        assert_eq!(template.instruction.placeholders().count(), 3);
    }

    #[test]
    fn replacement_table_from_ron() {
        let table = ReplacementTable::parse_ron(r#"(colors: ["teal"], numbers: [3])"#).unwrap();
        assert_eq!(table.colors, vec!["teal".to_string()]);
        assert_eq!(table.numbers, vec![3]);
        // missing fields fall back to defaults
        assert_eq!(table.len_of(Placeholder::Object), 4);
    }
}
