//! Read-result merging

use crate::core::codec;
use crate::domain::{BundleEntryResponse, Operation, Result, StoredItem, VellumError};

/// Back-fills read responses with the batched get results.
///
/// The k-th read entry, in list order, receives the k-th result. Returns the
/// same, filled-in list. A missing result at any read position fails the whole
/// merge and leaves `responses` untouched.
pub fn populate_bundle_entry_responses_with_read_results<'a>(
    responses: &'a mut [BundleEntryResponse],
    read_results: &[Option<StoredItem>],
) -> Result<&'a mut [BundleEntryResponse]> {
    let expected = responses
        .iter()
        .filter(|r| r.operation == Operation::Read)
        .count();
    let fulfilled = read_results
        .iter()
        .take(expected)
        .take_while(|r| r.is_some())
        .count();
    if fulfilled < expected {
        return Err(VellumError::ReadRequestsNotFulfilled {
            expected,
            received: fulfilled,
        });
    }

    let reads = responses
        .iter_mut()
        .filter(|r| r.operation == Operation::Read);
    for (response, item) in reads.zip(read_results.iter().flatten()) {
        response.resource = codec::decode(item);
        response.last_modified = item.last_updated().unwrap_or_default().to_string();
    }

    Ok(responses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DocumentStatus;
    use serde_json::json;

    fn response(id: &str, operation: Operation) -> BundleEntryResponse {
        BundleEntryResponse {
            id: id.to_string(),
            vid: Some(1),
            resource_type: "Patient".to_string(),
            operation,
            last_modified: String::new(),
            resource: json!({}),
        }
    }

    fn stored(id: &str, family: &str) -> StoredItem {
        codec::encode(
            &json!({"resourceType": "Patient", "name": [{"family": family}]}),
            id,
            1,
            DocumentStatus::Locked,
        )
        .unwrap()
    }

    #[test]
    fn test_kth_read_receives_kth_result() {
        let mut responses = vec![
            response("a", Operation::Read),
            response("x", Operation::Create),
            response("b", Operation::Read),
        ];
        let results = vec![Some(stored("a", "First")), Some(stored("b", "Second"))];

        let merged =
            populate_bundle_entry_responses_with_read_results(&mut responses, &results).unwrap();
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[2].resource["name"][0]["family"], "Second");

        assert_eq!(responses[0].resource["name"][0]["family"], "First");
        assert_eq!(responses[2].resource["name"][0]["family"], "Second");
        assert_eq!(responses[1].resource, json!({}));
        assert!(!responses[0].last_modified.is_empty());
        assert!(responses[0].resource.get("documentStatus").is_none());
    }

    #[test]
    fn test_too_few_results_fail() {
        let mut responses = vec![response("a", Operation::Read), response("b", Operation::Read)];
        let results = vec![Some(stored("a", "Only"))];

        let err = populate_bundle_entry_responses_with_read_results(&mut responses, &results)
            .unwrap_err();
        assert!(matches!(
            err,
            VellumError::ReadRequestsNotFulfilled {
                expected: 2,
                received: 1
            }
        ));
        assert_eq!(responses[0].resource, json!({}));
    }

    #[test]
    fn test_missing_item_in_the_middle_fails() {
        let mut responses = vec![response("a", Operation::Read), response("b", Operation::Read)];
        let results = vec![None, Some(stored("b", "Later"))];
        assert!(
            populate_bundle_entry_responses_with_read_results(&mut responses, &results).is_err()
        );
    }

    #[test]
    fn test_no_reads_is_a_no_op() {
        let mut responses = vec![response("x", Operation::Delete)];
        populate_bundle_entry_responses_with_read_results(&mut responses, &[]).unwrap();
        assert_eq!(responses[0].resource, json!({}));
    }

    #[test]
    fn test_missing_last_updated_yields_empty_string() {
        let mut item = stored("a", "NoMeta");
        item.body.remove("meta");
        let mut responses = vec![response("a", Operation::Read)];
        populate_bundle_entry_responses_with_read_results(&mut responses, &[Some(item)]).unwrap();
        assert_eq!(responses[0].last_modified, "");
    }
}
