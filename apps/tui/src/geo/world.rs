use super::{Outline, PathCommand, Point, Projection};
use crate::error::{FlowMapError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Map space of the built-in geography, used as the svg `viewBox`.
pub const VIEW_WIDTH: f64 = 700.0;
pub const VIEW_HEIGHT: f64 = 400.0;

/// A drawn area: a continent (no code) or a country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    #[serde(default)]
    pub code: Option<String>,
    pub name: String,
    pub outline: Outline,
    #[serde(skip)]
    center: Option<Point>,
}

impl Region {
    pub fn new(code: Option<&str>, name: &str, outline: Outline) -> Self {
        let center = outline.centroid();
        Self {
            code: code.map(str::to_string),
            name: name.to_string(),
            outline,
            center,
        }
    }

    /// Representative center, computed once when the table is loaded.
    pub const fn center(&self) -> Option<Point> {
        self.center
    }
}

/// A country known only by its coordinates, drawn as a dot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub code: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

/// The static table a map is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geography {
    #[serde(default = "default_view")]
    pub view: [f64; 2],
    #[serde(default)]
    pub continents: Vec<Region>,
    pub countries: Vec<Region>,
    #[serde(default, alias = "markers")]
    pub sites: Vec<Site>,
    /// Alternative code -> canonical code.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub projection: Option<Projection>,
}

const fn default_view() -> [f64; 2] {
    [VIEW_WIDTH, VIEW_HEIGHT]
}

impl Geography {
    /// The built-in world table, built once per process.
    pub fn builtin() -> &'static Self {
        static BUILTIN: OnceLock<Geography> = OnceLock::new();
        BUILTIN.get_or_init(build_builtin)
    }

    /// Parses a table from JSON and checks that it can be drawn.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut geography: Self =
            serde_json::from_str(json).map_err(|e| FlowMapError::Geography(e.to_string()))?;
        for region in geography
            .continents
            .iter_mut()
            .chain(geography.countries.iter_mut())
        {
            region.center = region.outline.centroid();
        }
        geography.validate()?;
        Ok(geography)
    }

    pub fn validate(&self) -> Result<()> {
        if self.countries.is_empty() && self.sites.is_empty() {
            return Err(FlowMapError::Geography("no countries defined".to_string()));
        }
        if !(self.view[0] > 0.0 && self.view[1] > 0.0) {
            return Err(FlowMapError::Geography(format!(
                "invalid view {}x{}",
                self.view[0], self.view[1]
            )));
        }
        for region in self.continents.iter().chain(&self.countries) {
            if region.outline.is_empty() || region.center.is_none() {
                return Err(FlowMapError::Geography(format!(
                    "{} has no outline",
                    region.name
                )));
            }
        }
        if let Some(country) = self.countries.iter().find(|c| c.code.is_none()) {
            return Err(FlowMapError::Geography(format!(
                "country {} has no code",
                country.name
            )));
        }
        Ok(())
    }

    pub fn projection(&self) -> Projection {
        self.projection
            .unwrap_or_else(|| Projection::fit(self.view[0], self.view[1]))
    }

    /// Canonical code for `code`, following the alias table.
    pub fn canonical<'a>(&'a self, code: &'a str) -> &'a str {
        self.aliases.get(code).map_or(code, String::as_str)
    }
}

const fn m(x: f64, y: f64) -> PathCommand {
    PathCommand::MoveTo(Point::new(x, y))
}

const fn l(x: f64, y: f64) -> PathCommand {
    PathCommand::LineTo(Point::new(x, y))
}

const fn c(x1: f64, y1: f64, x2: f64, y2: f64, x: f64, y: f64) -> PathCommand {
    PathCommand::CubicTo(Point::new(x1, y1), Point::new(x2, y2), Point::new(x, y))
}

const Z: PathCommand = PathCommand::Close;

struct Shape {
    code: Option<&'static str>,
    name: &'static str,
    outline: &'static [PathCommand],
}

static CONTINENTS: &[Shape] = &[
    Shape {
        code: None,
        name: "North America",
        outline: &[
            m(55.0, 100.0),
            c(90.0, 85.0, 130.0, 85.0, 160.0, 100.0),
            l(180.0, 120.0),
            c(190.0, 140.0, 195.0, 160.0, 185.0, 185.0),
            c(170.0, 200.0, 150.0, 210.0, 125.0, 215.0),
            c(90.0, 210.0, 70.0, 195.0, 55.0, 180.0),
            c(45.0, 160.0, 40.0, 130.0, 55.0, 100.0),
            Z,
        ],
    },
    Shape {
        code: None,
        name: "South America",
        outline: &[
            m(130.0, 230.0),
            c(160.0, 225.0, 175.0, 230.0, 185.0, 250.0),
            c(190.0, 280.0, 195.0, 310.0, 185.0, 340.0),
            c(170.0, 360.0, 150.0, 370.0, 130.0, 375.0),
            c(110.0, 365.0, 100.0, 345.0, 95.0, 325.0),
            c(100.0, 280.0, 110.0, 250.0, 130.0, 230.0),
            Z,
        ],
    },
    Shape {
        code: None,
        name: "Europe",
        outline: &[
            m(270.0, 110.0),
            c(290.0, 100.0, 320.0, 95.0, 345.0, 100.0),
            c(360.0, 115.0, 370.0, 130.0, 365.0, 150.0),
            c(355.0, 165.0, 340.0, 175.0, 315.0, 180.0),
            c(290.0, 175.0, 275.0, 165.0, 265.0, 150.0),
            c(260.0, 135.0, 260.0, 120.0, 270.0, 110.0),
            Z,
        ],
    },
    Shape {
        code: None,
        name: "Africa",
        outline: &[
            m(270.0, 190.0),
            c(300.0, 185.0, 330.0, 185.0, 355.0, 190.0),
            c(370.0, 210.0, 375.0, 240.0, 370.0, 270.0),
            c(360.0, 300.0, 340.0, 320.0, 315.0, 330.0),
            c(290.0, 325.0, 270.0, 310.0, 260.0, 290.0),
            c(250.0, 260.0, 245.0, 230.0, 250.0, 210.0),
            c(255.0, 200.0, 260.0, 195.0, 270.0, 190.0),
            Z,
        ],
    },
    Shape {
        code: None,
        name: "Asia",
        outline: &[
            m(370.0, 120.0),
            c(410.0, 100.0, 460.0, 90.0, 510.0, 95.0),
            c(550.0, 105.0, 580.0, 120.0, 590.0, 150.0),
            c(595.0, 180.0, 585.0, 210.0, 565.0, 240.0),
            c(520.0, 270.0, 470.0, 285.0, 420.0, 280.0),
            c(390.0, 270.0, 370.0, 250.0, 355.0, 220.0),
            c(345.0, 190.0, 345.0, 150.0, 370.0, 120.0),
            Z,
        ],
    },
    Shape {
        code: None,
        name: "Australia",
        outline: &[
            m(580.0, 280.0),
            c(600.0, 275.0, 620.0, 275.0, 635.0, 285.0),
            c(645.0, 300.0, 645.0, 320.0, 635.0, 335.0),
            c(620.0, 345.0, 600.0, 345.0, 585.0, 340.0),
            c(570.0, 330.0, 565.0, 310.0, 570.0, 295.0),
            c(570.0, 290.0, 575.0, 285.0, 580.0, 280.0),
            Z,
        ],
    },
];

static COUNTRIES: &[Shape] = &[
    Shape {
        code: Some("840"),
        name: "United States",
        outline: &[
            m(70.0, 140.0),
            c(100.0, 135.0, 130.0, 135.0, 155.0, 140.0),
            c(165.0, 150.0, 170.0, 160.0, 165.0, 175.0),
            c(155.0, 185.0, 135.0, 190.0, 115.0, 190.0),
            c(95.0, 185.0, 80.0, 175.0, 75.0, 165.0),
            c(70.0, 155.0, 70.0, 145.0, 70.0, 140.0),
            Z,
        ],
    },
    Shape {
        code: Some("124"),
        name: "Canada",
        outline: &[
            m(70.0, 100.0),
            c(100.0, 90.0, 140.0, 90.0, 170.0, 100.0),
            c(175.0, 110.0, 175.0, 120.0, 170.0, 130.0),
            c(165.0, 135.0, 160.0, 138.0, 155.0, 140.0),
            c(125.0, 135.0, 95.0, 135.0, 70.0, 140.0),
            c(65.0, 130.0, 65.0, 115.0, 70.0, 100.0),
            Z,
        ],
    },
    Shape {
        code: Some("484"),
        name: "Mexico",
        outline: &[
            m(80.0, 170.0),
            c(90.0, 175.0, 100.0, 180.0, 110.0, 180.0),
            c(115.0, 190.0, 115.0, 200.0, 110.0, 205.0),
            c(100.0, 208.0, 90.0, 208.0, 80.0, 205.0),
            c(75.0, 195.0, 75.0, 180.0, 80.0, 170.0),
            Z,
        ],
    },
    Shape {
        code: Some("076"),
        name: "Brazil",
        outline: &[
            m(140.0, 260.0),
            c(155.0, 255.0, 170.0, 255.0, 180.0, 260.0),
            c(185.0, 275.0, 190.0, 290.0, 185.0, 310.0),
            c(175.0, 325.0, 160.0, 335.0, 145.0, 335.0),
            c(130.0, 330.0, 120.0, 320.0, 115.0, 305.0),
            c(120.0, 285.0, 125.0, 270.0, 140.0, 260.0),
            Z,
        ],
    },
    Shape {
        code: Some("826"),
        name: "United Kingdom",
        outline: &[
            m(260.0, 130.0),
            c(265.0, 128.0, 270.0, 128.0, 275.0, 130.0),
            c(277.0, 135.0, 277.0, 140.0, 275.0, 145.0),
            c(270.0, 148.0, 265.0, 148.0, 260.0, 145.0),
            c(258.0, 140.0, 258.0, 135.0, 260.0, 130.0),
            Z,
        ],
    },
    Shape {
        code: Some("276"),
        name: "Germany",
        outline: &[
            m(300.0, 140.0),
            c(307.0, 138.0, 314.0, 138.0, 320.0, 140.0),
            c(322.0, 145.0, 322.0, 150.0, 320.0, 155.0),
            c(315.0, 158.0, 305.0, 158.0, 300.0, 155.0),
            c(298.0, 150.0, 298.0, 145.0, 300.0, 140.0),
            Z,
        ],
    },
    Shape {
        code: Some("250"),
        name: "France",
        outline: &[
            m(280.0, 150.0),
            c(287.0, 148.0, 294.0, 148.0, 300.0, 150.0),
            c(302.0, 155.0, 302.0, 160.0, 300.0, 165.0),
            c(295.0, 168.0, 285.0, 168.0, 280.0, 165.0),
            c(278.0, 160.0, 278.0, 155.0, 280.0, 150.0),
            Z,
        ],
    },
    Shape {
        code: Some("156"),
        name: "China",
        outline: &[
            m(450.0, 150.0),
            c(470.0, 145.0, 495.0, 145.0, 520.0, 150.0),
            c(525.0, 165.0, 525.0, 180.0, 520.0, 195.0),
            c(505.0, 205.0, 475.0, 210.0, 455.0, 205.0),
            c(445.0, 195.0, 440.0, 175.0, 450.0, 150.0),
            Z,
        ],
    },
    Shape {
        code: Some("356"),
        name: "India",
        outline: &[
            m(430.0, 210.0),
            c(445.0, 205.0, 460.0, 205.0, 470.0, 210.0),
            c(472.0, 220.0, 472.0, 235.0, 470.0, 245.0),
            c(460.0, 250.0, 440.0, 250.0, 430.0, 245.0),
            c(425.0, 235.0, 425.0, 220.0, 430.0, 210.0),
            Z,
        ],
    },
    Shape {
        code: Some("392"),
        name: "Japan",
        outline: &[
            m(550.0, 160.0),
            c(555.0, 158.0, 560.0, 158.0, 565.0, 160.0),
            c(567.0, 165.0, 567.0, 170.0, 565.0, 175.0),
            c(560.0, 177.0, 550.0, 177.0, 545.0, 175.0),
            c(543.0, 170.0, 545.0, 165.0, 550.0, 160.0),
            Z,
        ],
    },
    Shape {
        code: Some("036"),
        name: "Australia",
        outline: &[
            m(590.0, 300.0),
            c(605.0, 295.0, 620.0, 295.0, 630.0, 300.0),
            c(632.0, 310.0, 632.0, 320.0, 630.0, 330.0),
            c(620.0, 335.0, 600.0, 335.0, 590.0, 330.0),
            c(585.0, 320.0, 585.0, 310.0, 590.0, 300.0),
            Z,
        ],
    },
];

// (code, name, lat, lng)
static SITES: &[(&str, &str, f64, f64)] = &[
    ("410", "South Korea", 35.9078, 127.7669),
    ("380", "Italy", 41.8719, 12.5674),
    ("528", "Netherlands", 52.1326, 5.2913),
    ("756", "Switzerland", 46.8182, 8.2275),
];

static ALIASES: &[(&str, &str)] = &[("842", "840")];

// Fitted to the hand-drawn outlines so coordinate-only countries land on
// their continent.
const BUILTIN_PROJECTION: Projection = Projection::new(293.0, 262.0, 1.84, 140.0);

fn build_regions(shapes: &[Shape]) -> Vec<Region> {
    shapes
        .iter()
        .map(|shape| Region::new(shape.code, shape.name, Outline::from_commands(shape.outline)))
        .collect()
}

fn build_builtin() -> Geography {
    Geography {
        view: default_view(),
        continents: build_regions(CONTINENTS),
        countries: build_regions(COUNTRIES),
        sites: SITES
            .iter()
            .map(|&(code, name, lat, lng)| Site {
                code: code.to_string(),
                name: name.to_string(),
                lat,
                lng,
            })
            .collect(),
        aliases: ALIASES
            .iter()
            .map(|&(alias, code)| (alias.to_string(), code.to_string()))
            .collect(),
        projection: Some(BUILTIN_PROJECTION),
    }
}
