use crate::post::{RawPost, User};
use serde::Serialize;

/// Deepest region level a resolver is asked for.
pub const MAX_REGION_LEVEL: u8 = 3;

const AUTO_REGION_NAME: &str = "auto";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub code: String,
    pub name: String,
}

/// Point-in-region lookup for nested administrative regions, level 1 being
/// the coarsest.
pub trait GeoResolver: Send + Sync {
    fn resolve(&self, point: GeoPoint, level: u8) -> Option<Region>;
}

/// Resolves nothing; used when region lookup is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeoResolver;

impl GeoResolver for NoGeoResolver {
    fn resolve(&self, _point: GeoPoint, _level: u8) -> Option<Region> {
        None
    }
}

/// A point plus the finest region level its geometry can support.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoEstimate {
    pub point: GeoPoint,
    pub precision: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoSource {
    Tweet,
    Profile,
}

/// Region fields stored on a document when region lookup is enabled.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeoFields {
    pub geo_source: Option<GeoSource>,
    pub geo_coord: Option<GeoPoint>,
    pub geo_nuts_level: u8,
    pub geo_nuts1_code: Option<String>,
    pub geo_nuts1_name: Option<String>,
    pub geo_nuts2_code: Option<String>,
    pub geo_nuts2_name: Option<String>,
    pub geo_nuts3_code: Option<String>,
    pub geo_nuts3_name: Option<String>,
}

/// Mean of `[lon, lat]` vertices.
pub fn average_point(points: &[[f64; 2]]) -> Option<GeoPoint> {
    if points.is_empty() {
        return None;
    }

    let count = points.len() as f64;
    let (lon, lat) = points
        .iter()
        .fold((0.0, 0.0), |(lon, lat), [x, y]| (lon + x, lat + y));
    Some(GeoPoint {
        lat: lat / count,
        lon: lon / count,
    })
}

pub fn place_precision(place_type: &str) -> u8 {
    match place_type {
        "admin" | "neighborhood" => 2,
        "city" | "poi" => 3,
        _ => 0,
    }
}

/// Exact coordinates first, else the centre of the place bounding box.
pub fn post_estimate(post: &RawPost) -> Option<GeoEstimate> {
    if let Some(coordinates) = &post.coordinates {
        let [lon, lat] = coordinates.coordinates;
        return Some(GeoEstimate {
            point: GeoPoint { lat, lon },
            precision: MAX_REGION_LEVEL,
        });
    }

    let place = post.place.as_ref()?;
    let ring = place.bounding_box.as_ref()?.coordinates.first()?;
    average_point(ring).map(|point| GeoEstimate {
        point,
        precision: place_precision(&place.place_type),
    })
}

/// First derived profile location naming a locality or sub-region.
pub fn profile_estimate(user: &User) -> Option<GeoEstimate> {
    let location = user
        .derived
        .as_ref()?
        .locations
        .iter()
        .find(|location| location.locality.is_some() || location.sub_region.is_some())?;

    let geometry = location.geo.as_ref()?;
    average_point(&geometry.coordinates.points()).map(|point| GeoEstimate {
        point,
        precision: 2,
    })
}

/// Looks up levels `1..=min(search_level, precision)` and fills a missing
/// coarser code from the prefix of a finer one.
pub fn resolve_regions(
    resolver: &dyn GeoResolver,
    estimate: GeoEstimate,
    search_level: u8,
) -> [Option<Region>; 3] {
    let deepest = search_level.min(estimate.precision).min(MAX_REGION_LEVEL);
    let mut regions: [Option<Region>; 3] = Default::default();
    for level in 1..=deepest {
        regions[usize::from(level - 1)] = resolver.resolve(estimate.point, level);
    }

    if regions[1].is_none() {
        regions[1] = regions[2].as_ref().map(|region| derived_region(region, 4));
    }
    if regions[0].is_none() {
        regions[0] = regions[1].as_ref().map(|region| derived_region(region, 3));
    }

    regions
}

fn derived_region(finer: &Region, prefix_len: usize) -> Region {
    Region {
        code: finer.code.chars().take(prefix_len).collect(),
        name: AUTO_REGION_NAME.to_string(),
    }
}

/// Region fields from the post geometry when it has any, otherwise from
/// the profile.
pub fn resolve_fields(
    resolver: &dyn GeoResolver,
    post: Option<GeoEstimate>,
    profile: Option<GeoEstimate>,
    search_level: u8,
) -> GeoFields {
    let (source, estimate) = match (post, profile) {
        (Some(estimate), _) => (GeoSource::Tweet, estimate),
        (None, Some(estimate)) => (GeoSource::Profile, estimate),
        (None, None) => return GeoFields::default(),
    };

    let [level1, level2, level3] = resolve_regions(resolver, estimate, search_level);
    let (geo_nuts1_code, geo_nuts1_name) = split_region(level1);
    let (geo_nuts2_code, geo_nuts2_name) = split_region(level2);
    let (geo_nuts3_code, geo_nuts3_name) = split_region(level3);

    GeoFields {
        geo_source: Some(source),
        geo_coord: Some(estimate.point),
        geo_nuts_level: estimate.precision,
        geo_nuts1_code,
        geo_nuts1_name,
        geo_nuts2_code,
        geo_nuts2_name,
        geo_nuts3_code,
        geo_nuts3_name,
    }
}

fn split_region(region: Option<Region>) -> (Option<String>, Option<String>) {
    match region {
        Some(Region { code, name }) => (Some(code), Some(name)),
        None => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::fixtures;
    use serde_json::json;

    struct FixedResolver {
        levels: Vec<(u8, &'static str, &'static str)>,
    }

    impl GeoResolver for FixedResolver {
        fn resolve(&self, _point: GeoPoint, level: u8) -> Option<Region> {
            self.levels
                .iter()
                .find(|(wanted, _, _)| *wanted == level)
                .map(|(_, code, name)| Region {
                    code: code.to_string(),
                    name: name.to_string(),
                })
        }
    }

    fn estimate(precision: u8) -> GeoEstimate {
        GeoEstimate {
            point: GeoPoint {
                lat: 53.8,
                lon: -1.55,
            },
            precision,
        }
    }

    #[test]
    fn average_of_bounding_box() {
        let point = average_point(&[[0.0, 0.0], [2.0, 0.0], [2.0, 4.0], [0.0, 4.0]]);
        assert_eq!(point, Some(GeoPoint { lat: 2.0, lon: 1.0 }));
        assert_eq!(average_point(&[]), None);
    }

    #[test]
    fn place_types_map_to_precision() {
        assert_eq!(place_precision("country"), 0);
        assert_eq!(place_precision("admin"), 2);
        assert_eq!(place_precision("neighborhood"), 2);
        assert_eq!(place_precision("city"), 3);
        assert_eq!(place_precision("poi"), 3);
    }

    #[test]
    fn exact_coordinates_beat_place() -> Result<(), serde_json::Error> {
        let mut value = fixtures::post("1", "alice", "hi");
        value["coordinates"] = json!({"type": "Point", "coordinates": [-1.55, 53.8]});
        value["place"] = json!({
            "full_name": "Leeds, England",
            "country": "United Kingdom",
            "place_type": "country",
            "bounding_box": {"coordinates": [[[0.0, 0.0], [1.0, 1.0]]]}
        });
        let post: RawPost = serde_json::from_value(value)?;
        assert_eq!(post_estimate(&post), Some(estimate(3)));
        Ok(())
    }

    #[test]
    fn place_box_gives_centre_and_type_precision() -> Result<(), serde_json::Error> {
        let mut value = fixtures::post("1", "alice", "hi");
        value["place"] = json!({
            "full_name": "Leeds, England",
            "country": "United Kingdom",
            "place_type": "city",
            "bounding_box": {"coordinates": [[[-2.0, 53.0], [-1.0, 53.0], [-1.0, 54.0], [-2.0, 54.0]]]}
        });
        let post: RawPost = serde_json::from_value(value)?;
        let found = post_estimate(&post);
        assert_eq!(
            found,
            Some(GeoEstimate {
                point: GeoPoint { lat: 53.5, lon: -1.5 },
                precision: 3
            })
        );
        Ok(())
    }

    #[test]
    fn profile_location_needs_locality_or_sub_region() -> Result<(), serde_json::Error> {
        let mut value = fixtures::post("1", "alice", "hi");
        value["user"]["derived"] = json!({"locations": [
            {"country": "United Kingdom", "geo": {"type": "point", "coordinates": [0.0, 0.0]}},
            {"locality": "Leeds", "geo": {"type": "point", "coordinates": [-1.55, 53.8]}}
        ]});
        let post: RawPost = serde_json::from_value(value)?;
        assert_eq!(profile_estimate(&post.user), Some(estimate(2)));
        Ok(())
    }

    #[test]
    fn lookups_stop_at_supported_precision() {
        let resolver = FixedResolver {
            levels: vec![(1, "UKE", "Yorkshire"), (2, "UKE4", "West Yorkshire"), (3, "UKE42", "Leeds")],
        };
        let regions = resolve_regions(&resolver, estimate(2), 3);
        assert_eq!(regions[1].as_ref().map(|r| r.code.as_str()), Some("UKE4"));
        assert!(regions[2].is_none());

        let regions = resolve_regions(&resolver, estimate(3), 1);
        assert_eq!(regions[0].as_ref().map(|r| r.name.as_str()), Some("Yorkshire"));
        assert!(regions[1].is_none());
    }

    #[test]
    fn coarser_levels_are_derived_from_finer_codes() {
        let resolver = FixedResolver {
            levels: vec![(3, "UKE42", "Leeds")],
        };
        let regions = resolve_regions(&resolver, estimate(3), 3);
        assert_eq!(
            regions,
            [
                Some(Region { code: "UKE".into(), name: "auto".into() }),
                Some(Region { code: "UKE4".into(), name: "auto".into() }),
                Some(Region { code: "UKE42".into(), name: "Leeds".into() }),
            ]
        );
    }

    #[test]
    fn post_geometry_wins_over_profile() {
        let resolver = FixedResolver {
            levels: vec![(1, "UKE", "Yorkshire")],
        };
        let fields = resolve_fields(&resolver, Some(estimate(0)), Some(estimate(2)), 3);
        assert_eq!(fields.geo_source, Some(GeoSource::Tweet));
        assert_eq!(fields.geo_nuts_level, 0);
        assert_eq!(fields.geo_nuts1_code, None);

        let fields = resolve_fields(&resolver, None, Some(estimate(2)), 3);
        assert_eq!(fields.geo_source, Some(GeoSource::Profile));
        assert_eq!(fields.geo_nuts1_code.as_deref(), Some("UKE"));

        assert_eq!(resolve_fields(&NoGeoResolver, None, None, 3), GeoFields::default());
    }
}
