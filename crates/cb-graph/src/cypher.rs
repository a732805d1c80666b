//! Parameterized Cypher construction for facility filter queries.
//!
//! Pure functions so the query text and parameter maps are testable
//! without a store. Condition precedence: facility-name substring,
//! service-type exact, district exact, then one OR-group across all
//! keywords (name or address substring). All present conditions are
//! ANDed; an empty filter matches everything.

use serde_json::{Map, Value};

use cb_protocol::SearchFilter;

/// Build the facility search query and its parameter map.
pub fn build_search_query(filter: &SearchFilter, limit: u32) -> (String, Map<String, Value>) {
    let mut conditions: Vec<String> = Vec::new();
    let mut params = Map::new();

    if let Some(name) = &filter.facility_name {
        conditions.push("f.name CONTAINS $facility_name".into());
        params.insert("facility_name".into(), Value::String(name.clone()));
    }

    if let Some(service_type) = &filter.service_type {
        conditions.push("f.service_type = $service_type".into());
        params.insert("service_type".into(), Value::String(service_type.clone()));
    }

    if let Some(district) = &filter.district {
        conditions.push("f.district = $district".into());
        params.insert("district".into(), Value::String(district.clone()));
    }

    if !filter.keywords.is_empty() {
        let mut keyword_conditions = Vec::new();
        for (i, keyword) in filter.keywords.iter().enumerate() {
            let key = format!("keyword{i}");
            keyword_conditions.push(format!(
                "(f.name CONTAINS ${key} OR f.address CONTAINS ${key})"
            ));
            params.insert(key, Value::String(keyword.clone()));
        }
        conditions.push(format!("({})", keyword_conditions.join(" OR ")));
    }

    let where_clause = if conditions.is_empty() {
        "true".to_string()
    } else {
        conditions.join(" AND ")
    };

    let query = format!(
        "MATCH (f:Facility) WHERE {where_clause} RETURN f ORDER BY f.name LIMIT $limit"
    );
    params.insert("limit".into(), Value::from(limit));

    (query, params)
}

/// Query returning the distinct service types present in the store.
pub fn service_types_query() -> &'static str {
    "MATCH (f:Facility) RETURN DISTINCT f.service_type AS service_type ORDER BY service_type"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_is_unconditional() {
        let (query, params) = build_search_query(&SearchFilter::default(), 20);
        assert!(query.contains("WHERE true"));
        assert!(query.contains("ORDER BY f.name"));
        assert_eq!(params["limit"], 20);
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn all_conditions_are_anded() {
        let filter = SearchFilter {
            facility_name: Some("みんなのhome".into()),
            service_type: Some("短期入所".into()),
            district: Some("八幡西区".into()),
            keywords: vec![],
        };
        let (query, params) = build_search_query(&filter, 20);
        assert!(query.contains(
            "f.name CONTAINS $facility_name AND f.service_type = $service_type AND f.district = $district"
        ));
        assert_eq!(params["facility_name"], "みんなのhome");
        assert_eq!(params["service_type"], "短期入所");
        assert_eq!(params["district"], "八幡西区");
    }

    #[test]
    fn keywords_form_an_or_group() {
        let filter = SearchFilter {
            keywords: vec!["送迎".into(), "医療的ケア".into()],
            ..SearchFilter::default()
        };
        let (query, params) = build_search_query(&filter, 10);
        assert!(query.contains(
            "((f.name CONTAINS $keyword0 OR f.address CONTAINS $keyword0) OR (f.name CONTAINS $keyword1 OR f.address CONTAINS $keyword1))"
        ));
        assert_eq!(params["keyword0"], "送迎");
        assert_eq!(params["keyword1"], "医療的ケア");
    }

    #[test]
    fn district_is_anded_with_keyword_group() {
        let filter = SearchFilter {
            district: Some("小倉北区".into()),
            keywords: vec!["送迎".into()],
            ..SearchFilter::default()
        };
        let (query, _) = build_search_query(&filter, 10);
        assert!(query.contains("f.district = $district AND ((f.name CONTAINS $keyword0"));
    }

    #[test]
    fn limit_is_parameterized() {
        let (query, params) = build_search_query(&SearchFilter::default(), 5);
        assert!(query.ends_with("LIMIT $limit"));
        assert_eq!(params["limit"], 5);
    }
}
