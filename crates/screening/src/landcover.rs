//! CLC2018 land-cover decoding.
//!
//! Maps the 44 Corine Land Cover 2018 level-3 class codes to names and
//! flags the water-body and wetland classes used by the screening rules.

/// CLC2018 level-3 codes and class names
const CLC_NAMES: &[(i32, &str)] = &[
    (111, "Continuous urban fabric"),
    (112, "Discontinuous urban fabric"),
    (121, "Industrial or commercial units"),
    (122, "Road and rail networks and associated land"),
    (123, "Port areas"),
    (124, "Airports"),
    (131, "Mineral extraction sites"),
    (132, "Dump sites"),
    (133, "Construction sites"),
    (141, "Green urban areas"),
    (142, "Sport and leisure facilities"),
    (211, "Non-irrigated arable land"),
    (212, "Permanently irrigated land"),
    (213, "Rice fields"),
    (221, "Vineyards"),
    (222, "Fruit trees and berry plantations"),
    (223, "Olive groves"),
    (231, "Pastures"),
    (241, "Annual crops associated with permanent crops"),
    (242, "Complex cultivation patterns"),
    (243, "Agriculture with significant natural vegetation"),
    (244, "Agro-forestry areas"),
    (311, "Broad-leaved forest"),
    (312, "Coniferous forest"),
    (313, "Mixed forest"),
    (321, "Natural grasslands"),
    (322, "Moors and heathland"),
    (323, "Sclerophyllous vegetation"),
    (324, "Transitional woodland-shrub"),
    (331, "Beaches, dunes, sands"),
    (332, "Bare rocks"),
    (333, "Sparsely vegetated areas"),
    (334, "Burnt areas"),
    (335, "Glaciers and perpetual snow"),
    (411, "Inland marshes"),
    (412, "Peat bogs"),
    (421, "Salt marshes"),
    (422, "Salines"),
    (423, "Intertidal flats"),
    (511, "Water courses"),
    (512, "Water bodies"),
    (521, "Coastal lagoons"),
    (522, "Estuaries"),
    (523, "Sea and ocean"),
];

/// CLC codes counted as water bodies for the near-water flag
pub const WATER_BODIES: &[i32] = &[511, 512, 521, 522, 523];

/// CLC codes counted as wetlands for the near-wetland flag
pub const WETLANDS: &[i32] = &[411, 412, 421, 422, 423];

/// Class name for a CLC2018 level-3 code, `"Unknown"` otherwise
pub fn clc_name(code: i32) -> &'static str {
    CLC_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or("Unknown")
}

/// Decoded land cover at a site
#[derive(Debug, Clone, PartialEq)]
pub struct LandCover {
    /// The CLC code, `None` when the raster had no data at the site
    pub code: Option<i32>,
    /// Class name, `"Unknown"` for missing or unrecognised codes
    pub name: &'static str,
    /// Whether the code is a water-body class
    pub near_water: bool,
    /// Whether the code is a wetland class
    pub near_wetland: bool,
}

/// Decode a sampled CLC raster value.
///
/// `None` and NaN decode to Unknown with both flags false.
pub fn decode(value: Option<f64>) -> LandCover {
    let code = match value {
        Some(v) if v.is_finite() => Some(v as i32),
        _ => None,
    };
    match code {
        Some(c) => LandCover {
            code: Some(c),
            name: clc_name(c),
            near_water: WATER_BODIES.contains(&c),
            near_wetland: WETLANDS.contains(&c),
        },
        None => LandCover {
            code: None,
            name: "Unknown",
            near_water: false,
            near_wetland: false,
        },
    }
}
