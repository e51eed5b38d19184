//! Resource operations against a mock provider


use std::sync::Arc;
use tcu_core::resources::{NewApplicant, Transfer};
use tcu_core::{Error, NoopCallLogger};
use test_support::RecordingCallLogger;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_check_status_many_applicants() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/applicants/checkStatus"))
        .and(body_string_contains(
            "<f4indexno>S0123/0001/2019</f4indexno><f4indexno>S0123/0002/2019</f4indexno>",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(test_support::xml_response(
            "<Applicant><f4indexno>S0123/0001/2019</f4indexno><StatusCode>200</StatusCode></Applicant>\
             <Applicant><f4indexno>S0123/0002/2019</f4indexno><StatusCode>208</StatusCode>\
             <StatusDescription>Already admitted</StatusDescription></Applicant>",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_support::client(&server.uri(), Arc::new(NoopCallLogger));
    let check = client
        .applicants()
        .check_status(&["S0123/0001/2019", "S0123/0002/2019"])
        .await
        .unwrap();

    assert_eq!(check.applicants.len(), 2);
    let second = check.get("S0123/0002/2019").unwrap();
    assert_eq!(second.status_code.as_deref(), Some("208"));
    assert_eq!(second.description.as_deref(), Some("Already admitted"));
}

#[tokio::test]
async fn test_invalid_input_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let logger = RecordingCallLogger::new();
    let client = test_support::client(&server.uri(), logger.clone());

    let err = client
        .applicants()
        .confirm("not-an-index", "12")
        .await
        .unwrap_err();

    match err.error() {
        Error::Validation(errors) => {
            assert_eq!(errors.len(), 2);
            assert_eq!(errors.for_field("confirmation_code").count(), 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(logger.events().is_empty());

    let err = client.applicants().check_status(&[]).await.unwrap_err();
    assert!(matches!(err.error(), Error::Validation(_)));
}

#[tokio::test]
async fn test_add_sends_one_block_per_applicant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/applicants/add"))
        .respond_with(ResponseTemplate::new(200).set_body_string(test_support::xml_response(
            "<StatusCode>200</StatusCode>",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_support::client(&server.uri(), Arc::new(NoopCallLogger));
    let applicants = vec![
        NewApplicant {
            f4indexno: "S0123/0001/2019".into(),
            category: "A".into(),
            ..Default::default()
        },
        NewApplicant {
            f4indexno: "S0123/0002/2019".into(),
            f6indexno: Some("S0123/0502/2021".into()),
            category: "A".into(),
            ..Default::default()
        },
    ];

    let tree = client.applicants().add(&applicants).await.unwrap();
    assert_eq!(tree.text("ResponseParameters.StatusCode").unwrap(), "200");

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    assert_eq!(body.matches("<RequestParameters>").count(), 2);
    assert_eq!(body.matches("<UsernameToken>").count(), 1);
}

#[tokio::test]
async fn test_admitted_list_and_dashboard() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/applicants/getAdmitted"))
        .and(body_string_contains("<ProgrammeCode>UD023</ProgrammeCode>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(test_support::xml_response(
            "<Applicant><f4indexno>S0123/0001/2019</f4indexno><MobileNumber>0712345678</MobileNumber></Applicant>",
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/dashboard/populate"))
        .and(body_string_contains("<Males>12</Males><Females>30</Females>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(test_support::xml_response(
            "<StatusCode>200</StatusCode>",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_support::client(&server.uri(), Arc::new(NoopCallLogger));

    let admitted = client.admissions().get_admitted("UD023").await.unwrap();
    assert_eq!(admitted.len(), 1);
    assert_eq!(admitted[0].mobile_number.as_deref(), Some("0712345678"));

    client.dashboard().populate("UD023", 12, 30).await.unwrap();
}

#[tokio::test]
async fn test_transfers_and_missing_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admission/submitInternalTransfers"))
        .and(body_string_contains("<CurrentProgrammeCode>UD023</CurrentProgrammeCode>"))
        .respond_with(ResponseTemplate::new(200).set_body_string(test_support::xml_response(
            "<StatusCode>200</StatusCode>",
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/admission/getInternalTransferStatus"))
        .respond_with(ResponseTemplate::new(200).set_body_string(test_support::xml_response(
            "<Applicant><StatusCode>200</StatusCode></Applicant>",
        )))
        .mount(&server)
        .await;

    let client = test_support::client(&server.uri(), Arc::new(NoopCallLogger));

    client
        .transfers()
        .submit_internal(&[Transfer {
            f4indexno: "S0123/0001/2019".into(),
            f6indexno: None,
            current_programme_code: "UD023".into(),
            previous_programme_code: "UD010".into(),
        }])
        .await
        .unwrap();

    let err = client.transfers().internal_status("UD023").await.unwrap_err();
    assert!(matches!(err.error(), Error::Field(_)));
}
