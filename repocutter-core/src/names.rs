//! Deterministic fancy-name generation for the obscure command.
//!
//! Names are drawn from the Cartesian product of a color ring and a noun
//! ring. The color index advances every step; the noun index advances at a
//! stride that visits every pair exactly once per period, which keeps
//! successive names visibly different. When the product is exhausted an
//! integer suffix is appended and the walk restarts. The same input token
//! always maps to the same fancy name within a run.

use std::collections::HashMap;

const COLORS: [&str; 48] = [
    "Amber", "Amethyst", "Argent", "Auburn", "Azure", "Beige", "Bronze", "Burgundy", "Carmine",
    "Celadon", "Cerise", "Cerulean", "Charcoal", "Chestnut", "Cinnabar", "Cobalt", "Copper",
    "Coral", "Crimson", "Damson", "Ebony", "Emerald", "Fallow", "Fuchsia", "Gamboge", "Golden",
    "Hazel", "Indigo", "Ivory", "Jade", "Lavender", "Lilac", "Magenta", "Maroon", "Mauve",
    "Ochre", "Olive", "Onyx", "Pearl", "Plum", "Russet", "Sable", "Saffron", "Scarlet", "Sepia",
    "Teal", "Umber", "Viridian",
];

const NOUNS: [&str; 46] = [
    "Angel", "Axe", "Bear", "Bison", "Condor", "Crane", "Dagger", "Drake", "Eagle", "Falcon",
    "Gannet", "Griffin", "Hammer", "Hawk", "Helm", "Heron", "Hound", "Ibis", "Javelin", "Kestrel",
    "Kite", "Lance", "Leopard", "Lion", "Lynx", "Mace", "Marten", "Osprey", "Otter", "Owl",
    "Panther", "Raven", "Rook", "Saber", "Serpent", "Shield", "Spear", "Stag", "Swan", "Sword",
    "Talon", "Tiger", "Viper", "Weasel", "Wolf", "Wyvern",
];

/// The per-run fancy-name source. One instance is owned by the obscure
/// command; there is no process-wide state.
pub struct NameSequence {
    colors: Vec<&'static str>,
    nouns: Vec<&'static str>,
    assigned: HashMap<String, String>,
}

impl NameSequence {
    pub fn new() -> Self {
        Self::with_rings(&COLORS, &NOUNS)
    }

    /// Build a sequence over custom rings. The walk covers the whole
    /// product before repeating as long as `gcd(colors-1, nouns)` is 1,
    /// which the default rings (48 x 46) satisfy.
    pub fn with_rings(colors: &[&'static str], nouns: &[&'static str]) -> Self {
        Self {
            colors: colors.to_vec(),
            nouns: nouns.to_vec(),
            assigned: HashMap::new(),
        }
    }

    /// The fancy name for ordinal `n`.
    fn generate(&self, n: usize) -> String {
        let ncolors = self.colors.len();
        let nnouns = self.nouns.len();
        let period = ncolors * nnouns;
        let round = n / period;
        let idx = n % period;
        let stride = ncolors + nnouns - 1;
        let color = self.colors[idx % ncolors];
        let noun = self.nouns[(idx * stride / ncolors) % nnouns];
        if round == 0 {
            format!("{}{}", color, noun)
        } else {
            format!("{}{}{}", color, noun, round)
        }
    }

    /// The consistent fancy name for `token`, minting a fresh one on first
    /// sight.
    pub fn obscure(&mut self, token: &str) -> String {
        if let Some(name) = self.assigned.get(token) {
            return name.clone();
        }
        let name = self.generate(self.assigned.len());
        self.assigned.insert(token.to_string(), name.clone());
        name
    }
}

impl Default for NameSequence {
    fn default() -> Self {
        Self::new()
    }
}
