//! Request and response models for the two endpoints.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::surface::UNDEF_LIMIT;

/// One surface blob belonging to one realization of a model ensemble.
#[derive(Clone, Debug, Deserialize, PartialEq, Validate)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RealizationObjectId {
    /// Realization number, echoed back so the client can correlate results.
    pub realization: i32,
    #[validate(length(min = 1, message = "objectUuid must not be empty"))]
    pub object_uuid: String,
}

/// Request body for `POST /sample_in_points`.
#[derive(Debug, Deserialize, PartialEq, Validate)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
#[validate(schema(function = "validate_sample_points_request"))]
pub struct SamplePointsRequest {
    /// Shared-access signature, passed through to the blob store verbatim.
    #[validate(length(min = 1, message = "sasToken must not be empty"))]
    pub sas_token: String,
    #[validate(length(min = 1, message = "blobStoreBaseUri must not be empty"))]
    pub blob_store_base_uri: String,
    #[validate]
    pub object_ids: Vec<RealizationObjectId>,
    pub x_coords: Vec<f64>,
    pub y_coords: Vec<f64>,
}

fn validate_sample_points_request(
    request: &SamplePointsRequest,
) -> Result<(), ValidationError> {
    if request.x_coords.len() != request.y_coords.len() {
        return Err(ValidationError::new(
            "xCoords and yCoords must have the same length",
        ));
    }
    Ok(())
}

/// Sampled Z values for one realization, in the order of the request's
/// coordinate arrays.
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealizationSampleResult {
    pub realization: i32,
    pub sampled_values: Vec<f32>,
}

/// Response body for `POST /sample_in_points`.
#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplePointsResponse {
    pub sample_result_arr: Vec<RealizationSampleResult>,
    /// Values at or above this limit are missing data; clients mask them.
    pub undef_limit: f32,
}

impl SamplePointsResponse {
    pub fn new(sample_result_arr: Vec<RealizationSampleResult>) -> SamplePointsResponse {
        SamplePointsResponse {
            sample_result_arr,
            undef_limit: UNDEF_LIMIT,
        }
    }
}

/// Request body for `POST /aggregate`.
#[derive(Debug, Deserialize, PartialEq, Validate)]
#[serde(deny_unknown_fields)]
pub struct AggregateRequest {
    /// Statistical operators to apply: `mean`, `min`, `max`, `std` or `pNN`.
    #[validate(length(min = 1, message = "operation must not be empty"))]
    pub operation: Vec<String>,
    /// Blob ids of the realization surfaces to aggregate.
    pub object_ids: Vec<String>,
    #[validate(length(min = 1, message = "base_uri must not be empty"))]
    pub base_uri: String,
    /// Shared-access signature, passed through to the blob store verbatim.
    #[validate(length(min = 1, message = "auth_token must not be empty"))]
    pub auth_token: String,
    /// Replace undefined cells with zero before aggregating.
    #[serde(default)]
    pub nan_as_zero: bool,
    /// Replace exact-zero result cells with the undefined sentinel.
    #[serde(default)]
    pub output_zero_as_nan: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_test::{assert_de_tokens, assert_de_tokens_error, Token};

    use crate::test_utils::{get_test_aggregate_request, get_test_sample_request};

    // The following tests use serde_test to validate the correct function of
    // the deserialiser. The validations are also tested.

    #[test]
    fn sample_request_fields() {
        let request = get_test_sample_request();
        assert_de_tokens(
            &request,
            &[
                Token::Struct {
                    name: "SamplePointsRequest",
                    len: 5,
                },
                Token::Str("sasToken"),
                Token::Str("sig=foo"),
                Token::Str("blobStoreBaseUri"),
                Token::Str("http://example.com/surfaces"),
                Token::Str("objectIds"),
                Token::Seq { len: Some(1) },
                Token::Struct {
                    name: "RealizationObjectId",
                    len: 2,
                },
                Token::Str("realization"),
                Token::I32(7),
                Token::Str("objectUuid"),
                Token::Str("blob-7"),
                Token::StructEnd,
                Token::SeqEnd,
                Token::Str("xCoords"),
                Token::Seq { len: Some(2) },
                Token::F64(0.0),
                Token::F64(1.0),
                Token::SeqEnd,
                Token::Str("yCoords"),
                Token::Seq { len: Some(2) },
                Token::F64(0.0),
                Token::F64(1.0),
                Token::SeqEnd,
                Token::StructEnd,
            ],
        );
        request.validate().unwrap()
    }

    #[test]
    fn sample_request_missing_sas_token() {
        assert_de_tokens_error::<SamplePointsRequest>(
            &[
                Token::Struct {
                    name: "SamplePointsRequest",
                    len: 5,
                },
                Token::StructEnd,
            ],
            "missing field `sasToken`",
        )
    }

    #[test]
    fn sample_request_unknown_field() {
        assert_de_tokens_error::<SamplePointsRequest>(
            &[
                Token::Struct {
                    name: "SamplePointsRequest",
                    len: 5,
                },
                Token::Str("foo"),
                Token::StructEnd,
            ],
            "unknown field `foo`, expected one of `sasToken`, `blobStoreBaseUri`, \
             `objectIds`, `xCoords`, `yCoords`",
        )
    }

    #[test]
    #[should_panic(expected = "sasToken must not be empty")]
    fn sample_request_empty_sas_token() {
        let mut request = get_test_sample_request();
        request.sas_token = String::new();
        request.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "objectUuid must not be empty")]
    fn sample_request_empty_object_uuid() {
        let mut request = get_test_sample_request();
        request.object_ids[0].object_uuid = String::new();
        request.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "xCoords and yCoords must have the same length")]
    fn sample_request_mismatched_coords() {
        let mut request = get_test_sample_request();
        request.y_coords.pop();
        request.validate().unwrap()
    }

    #[test]
    fn aggregate_request_defaults() {
        let request = get_test_aggregate_request();
        assert_de_tokens(
            &request,
            &[
                Token::Struct {
                    name: "AggregateRequest",
                    len: 4,
                },
                Token::Str("operation"),
                Token::Seq { len: Some(2) },
                Token::Str("mean"),
                Token::Str("p10"),
                Token::SeqEnd,
                Token::Str("object_ids"),
                Token::Seq { len: Some(2) },
                Token::Str("blob-1"),
                Token::Str("blob-2"),
                Token::SeqEnd,
                Token::Str("base_uri"),
                Token::Str("http://example.com/surfaces"),
                Token::Str("auth_token"),
                Token::Str("sig=foo"),
                Token::StructEnd,
            ],
        );
        assert!(!request.nan_as_zero);
        assert!(!request.output_zero_as_nan);
        request.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "operation must not be empty")]
    fn aggregate_request_empty_operation() {
        let mut request = get_test_aggregate_request();
        request.operation.clear();
        request.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "auth_token must not be empty")]
    fn aggregate_request_empty_auth_token() {
        let mut request = get_test_aggregate_request();
        request.auth_token = String::new();
        request.validate().unwrap()
    }

    // The following tests use JSON data, to check that the fields map as
    // expected.

    #[test]
    fn sample_request_from_json() {
        let json = r#"{
            "sasToken": "sig=foo",
            "blobStoreBaseUri": "http://example.com/surfaces",
            "objectIds": [{"realization": 7, "objectUuid": "blob-7"}],
            "xCoords": [0.0, 1.0],
            "yCoords": [0.0, 1.0]
        }"#;
        let request = serde_json::from_str::<SamplePointsRequest>(json).unwrap();
        assert_eq!(get_test_sample_request(), request);
    }

    #[test]
    fn aggregate_request_from_json() {
        let json = r#"{
            "operation": ["mean", "p10"],
            "object_ids": ["blob-1", "blob-2"],
            "base_uri": "http://example.com/surfaces",
            "auth_token": "sig=foo",
            "nan_as_zero": true,
            "output_zero_as_nan": true
        }"#;
        let request = serde_json::from_str::<AggregateRequest>(json).unwrap();
        assert!(request.nan_as_zero);
        assert!(request.output_zero_as_nan);
        assert_eq!(vec!["mean", "p10"], request.operation);
    }

    #[test]
    fn sample_response_to_json() {
        let response = SamplePointsResponse::new(vec![RealizationSampleResult {
            realization: 3,
            sampled_values: vec![1.5, 2.5],
        }]);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            serde_json::json!({
                "sampleResultArr": [
                    {"realization": 3, "sampledValues": [1.5, 2.5]}
                ],
                "undefLimit": 0.99e30_f32,
            }),
            json
        );
    }
}
