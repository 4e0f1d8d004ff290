//! The static territory catalog every room plays on.

use typeclaim_protocol::Territory;

/// `(id, display name, phrase)` for each territory, in map order.
const CATALOG: [(&str, &str, &str); 7] = [
    (
        "north-america",
        "North America",
        "North America is a diverse continent with vast landscapes, from the Arctic tundra of Canada to the tropical beaches of the Caribbean.",
    ),
    (
        "south-america",
        "South America",
        "South America is rich in biodiversity, featuring the Amazon Rainforest, the Andes Mountains, and unique wildlife.",
    ),
    (
        "europe",
        "Europe",
        "Europe packs dozens of countries and languages into a small continent, linked by rivers, railways, and centuries of shared history.",
    ),
    (
        "africa",
        "Africa",
        "Africa stretches from the Mediterranean coast to the Cape of Good Hope, crossing the Sahara Desert and the savannas of the Serengeti.",
    ),
    (
        "asia",
        "Asia",
        "Asia is the largest continent on Earth, home to the Himalayas, the Gobi Desert, and more than half of the world's people.",
    ),
    (
        "oceania",
        "Oceania",
        "Oceania spans thousands of Pacific islands along with Australia, whose Great Barrier Reef can be seen from space.",
    ),
    (
        "antarctica",
        "Antarctica",
        "Antarctica is the coldest, windiest, and driest continent, covered by an ice sheet that holds most of the fresh water on the planet.",
    ),
];

/// Number of territories in a game.
pub const TERRITORY_COUNT: usize = CATALOG.len();

/// A fresh, fully unowned territory set.
pub fn territories() -> Vec<Territory> {
    CATALOG
        .iter()
        .map(|(id, name, phrase)| Territory {
            id: (*id).to_string(),
            name: (*name).to_string(),
            phrase: (*phrase).to_string(),
            owner: None,
        })
        .collect()
}
