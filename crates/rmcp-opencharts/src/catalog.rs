//! Static catalog of the OpenCharts products this server knows about.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a chart product on the OpenCharts API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ProductId {
    #[serde(rename = "extended-anomaly-z500")]
    ExtendedAnomalyZ500,
    #[serde(rename = "extended-anomaly-2t")]
    ExtendedAnomaly2t,
    #[serde(rename = "extended-anomaly-uv")]
    ExtendedAnomalyUv,
    #[serde(rename = "medium-2t-mean-spread")]
    Medium2tMeanSpread,
    #[serde(rename = "medium-t500-mean-spread")]
    MediumT500MeanSpread,
    #[serde(rename = "medium-10ws-mean-spread")]
    Medium10wsMeanSpread,
    #[serde(rename = "medium-ens-wind")]
    MediumEnsWind,
}

impl ProductId {
    pub const ALL: [ProductId; 7] = [
        ProductId::ExtendedAnomalyZ500,
        ProductId::ExtendedAnomaly2t,
        ProductId::ExtendedAnomalyUv,
        ProductId::Medium2tMeanSpread,
        ProductId::MediumT500MeanSpread,
        ProductId::Medium10wsMeanSpread,
        ProductId::MediumEnsWind,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductId::ExtendedAnomalyZ500 => "extended-anomaly-z500",
            ProductId::ExtendedAnomaly2t => "extended-anomaly-2t",
            ProductId::ExtendedAnomalyUv => "extended-anomaly-uv",
            ProductId::Medium2tMeanSpread => "medium-2t-mean-spread",
            ProductId::MediumT500MeanSpread => "medium-t500-mean-spread",
            ProductId::Medium10wsMeanSpread => "medium-10ws-mean-spread",
            ProductId::MediumEnsWind => "medium-ens-wind",
        }
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown product id: {0}")]
pub struct UnknownProduct(pub String);

impl FromStr for ProductId {
    type Err = UnknownProduct;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProductId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownProduct(s.to_string()))
    }
}

/// Forecast horizon a product belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeClass {
    SubSeasonal,
    Medium,
}

impl RangeClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeClass::SubSeasonal => "sub-seasonal",
            RangeClass::Medium => "medium",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    Temperature,
    Wind,
    Geopotential,
}

impl Parameter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Parameter::Temperature => "temperature",
            Parameter::Wind => "wind",
            Parameter::Geopotential => "geopotential",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductKind {
    Forecast,
}

impl ProductKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductKind::Forecast => "forecast",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: &'static str,
    pub range: RangeClass,
    pub kind: ProductKind,
    pub parameters: &'static [Parameter],
}

impl Product {
    /// Comma separated parameter tags, e.g. `"temperature, wind"`.
    pub fn parameter_list(&self) -> String {
        self.parameters
            .iter()
            .map(Parameter::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Range filter accepted by `list_products`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RangeFilter {
    #[default]
    All,
    Medium,
    SubSeasonal,
}

impl RangeFilter {
    pub fn matches(&self, product: &Product) -> bool {
        match self {
            RangeFilter::All => true,
            RangeFilter::Medium => product.range == RangeClass::Medium,
            RangeFilter::SubSeasonal => product.range == RangeClass::SubSeasonal,
        }
    }
}

/// Parameter filter accepted by `list_products`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ParameterFilter {
    #[default]
    All,
    Temperature,
    Wind,
    Geopotential,
}

impl ParameterFilter {
    pub fn matches(&self, product: &Product) -> bool {
        let wanted = match self {
            ParameterFilter::All => return true,
            ParameterFilter::Temperature => Parameter::Temperature,
            ParameterFilter::Wind => Parameter::Wind,
            ParameterFilter::Geopotential => Parameter::Geopotential,
        };
        product.parameters.contains(&wanted)
    }
}

static PRODUCTS: [Product; 7] = [
    // Sub-seasonal
    Product {
        id: ProductId::ExtendedAnomalyZ500,
        name: "500 hPa height: Weekly mean anomalies",
        range: RangeClass::SubSeasonal,
        kind: ProductKind::Forecast,
        parameters: &[Parameter::Geopotential],
    },
    Product {
        id: ProductId::ExtendedAnomaly2t,
        name: "2m temperature: Weekly mean anomalies",
        range: RangeClass::SubSeasonal,
        kind: ProductKind::Forecast,
        parameters: &[Parameter::Temperature],
    },
    Product {
        id: ProductId::ExtendedAnomalyUv,
        name: "10m wind: Weekly mean anomalies",
        range: RangeClass::SubSeasonal,
        kind: ProductKind::Forecast,
        parameters: &[Parameter::Wind],
    },
    // Medium range ENS
    Product {
        id: ProductId::Medium2tMeanSpread,
        name: "Ensemble mean and spread: 2m temperature",
        range: RangeClass::Medium,
        kind: ProductKind::Forecast,
        parameters: &[Parameter::Temperature],
    },
    Product {
        id: ProductId::MediumT500MeanSpread,
        name: "Ensemble mean and spread: 500 hPa geopotential height",
        range: RangeClass::Medium,
        kind: ProductKind::Forecast,
        parameters: &[Parameter::Geopotential],
    },
    Product {
        id: ProductId::Medium10wsMeanSpread,
        name: "Ensemble mean and spread: 10m wind speed",
        range: RangeClass::Medium,
        kind: ProductKind::Forecast,
        parameters: &[Parameter::Wind],
    },
    Product {
        id: ProductId::MediumEnsWind,
        name: "Probabilities: 100m wind speed",
        range: RangeClass::Medium,
        kind: ProductKind::Forecast,
        parameters: &[Parameter::Wind],
    },
];

pub fn get(id: ProductId) -> Option<&'static Product> {
    PRODUCTS.iter().find(|p| p.id == id)
}

/// Products matching both filters, in catalog order.
pub fn list(range: RangeFilter, parameter: ParameterFilter) -> Vec<&'static Product> {
    PRODUCTS
        .iter()
        .filter(|p| range.matches(p) && parameter.matches(p))
        .collect()
}

/// Display name for a product, falling back to the raw identifier.
pub fn display_name(id: ProductId) -> &'static str {
    get(id).map(|p| p.name).unwrap_or_else(|| id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_id_has_an_entry() {
        for id in ProductId::ALL {
            assert_eq!(get(id).map(|p| p.id), Some(id));
        }
    }

    #[test]
    fn all_filters_return_full_catalog_in_order() {
        let ids: Vec<_> = list(RangeFilter::All, ParameterFilter::All)
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, ProductId::ALL.to_vec());
    }

    #[test]
    fn filters_are_a_conjunction() {
        let ids: Vec<_> = list(RangeFilter::Medium, ParameterFilter::Wind)
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(
            ids,
            vec![ProductId::Medium10wsMeanSpread, ProductId::MediumEnsWind]
        );

        let ids: Vec<_> = list(RangeFilter::SubSeasonal, ParameterFilter::Temperature)
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![ProductId::ExtendedAnomaly2t]);
    }

    #[test]
    fn every_filter_pair_matches_predicates() {
        let ranges = [RangeFilter::All, RangeFilter::Medium, RangeFilter::SubSeasonal];
        let params = [
            ParameterFilter::All,
            ParameterFilter::Temperature,
            ParameterFilter::Wind,
            ParameterFilter::Geopotential,
        ];
        for range in ranges {
            for param in params {
                let expected: Vec<_> = PRODUCTS
                    .iter()
                    .filter(|p| range.matches(p) && param.matches(p))
                    .map(|p| p.id)
                    .collect();
                let got: Vec<_> = list(range, param).into_iter().map(|p| p.id).collect();
                assert_eq!(got, expected, "{:?}/{:?}", range, param);
            }
        }
    }

    #[test]
    fn ids_round_trip_through_serde_and_from_str() {
        for id in ProductId::ALL {
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.as_str()));
            assert_eq!(id.as_str().parse::<ProductId>().unwrap(), id);
        }
        assert!("medium-rain".parse::<ProductId>().is_err());
        assert!(serde_json::from_str::<ProductId>("\"medium-rain\"").is_err());
    }

    #[test]
    fn labels_match_listing_text() {
        let p = get(ProductId::MediumT500MeanSpread).unwrap();
        assert_eq!(p.range.as_str(), "medium");
        assert_eq!(p.kind.as_str(), "forecast");
        assert_eq!(p.parameter_list(), "geopotential");
        assert_eq!(RangeClass::SubSeasonal.as_str(), "sub-seasonal");
    }

    #[test]
    fn filters_deserialize_from_wire_names() {
        let range: RangeFilter = serde_json::from_str("\"sub-seasonal\"").unwrap();
        assert_eq!(range, RangeFilter::SubSeasonal);
        let param: ParameterFilter = serde_json::from_str("\"geopotential\"").unwrap();
        assert_eq!(param, ParameterFilter::Geopotential);
    }
}
