use flowmailer::{
    config::FlowmailerConfig,
    transport::{FlowmailerContextBuilder, SendFlowmailerRawMessage, SendRawMessage},
};
use flowmailer_testing_server::{with_flowmailer_testing_server, FlowmailerTestingConfig};
use mail_builder::{headers::text::Text, MessageBuilder};
use serde_json::json;

#[test_log::test(tokio::test)]
async fn test_send_raw_message() {
    with_flowmailer_testing_server(FlowmailerTestingConfig::default(), |server| async move {
        let config = FlowmailerConfig {
            account_id: "1234".into(),
            client_id: "client-id".into(),
            client_secret: "client-secret".into(),
            api_url: Some(server.url.clone()),
            login_url: Some(server.url.clone()),
            ..Default::default()
        };

        let ctx = FlowmailerContextBuilder::new(config).build().unwrap();

        let raw = MessageBuilder::new()
            .from(("Alice", "alice@localhost"))
            .to(vec![("Bob", "bob@localhost")])
            .bcc("carol@localhost")
            .subject("Monthly report")
            .header("X-Tag", Text::new("reports"))
            .header("X-Metadata-Month", Text::new("june"))
            .header("X-Campaign", Text::new("summer"))
            .text_body("See attached report.")
            .html_body("<p>See attached report.</p>")
            .attachment("application/pdf", "report.pdf", b"%PDF-1.4".to_vec())
            .write_to_vec()
            .unwrap();

        let sent = SendFlowmailerRawMessage::new(&ctx)
            .send_raw_message(&raw)
            .await
            .unwrap();

        assert_eq!(sent.message_ids().collect::<Vec<_>>(), ["msg-1", "msg-2"]);

        let submissions = server.submissions();
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[0].field("recipientAddress"), Some("bob@localhost"));
        assert_eq!(submissions[1].field("recipientAddress"), Some("carol@localhost"));

        let body = &submissions[0].body;
        assert_eq!(body["senderAddress"], json!("alice@localhost"));
        assert_eq!(body["subject"], json!("Monthly report"));
        assert_eq!(body["headerToAddress"], json!("bob@localhost"));
        assert_eq!(body["tags"], json!(["reports"]));
        assert_eq!(body["data"], json!({ "Month": "june" }));
        assert_eq!(
            body["text"].as_str().map(str::trim),
            Some("See attached report.")
        );
        assert_eq!(
            body["html"].as_str().map(str::trim),
            Some("<p>See attached report.</p>")
        );

        let headers = body["headers"].as_array().unwrap();
        let names: Vec<_> = headers
            .iter()
            .filter_map(|header| header["name"].as_str())
            .collect();

        assert!(names.contains(&"X-Campaign"));
        for bypass in ["From", "To", "Bcc", "Subject", "Content-Type", "MIME-Version"] {
            assert!(
                !names.iter().any(|name| name.eq_ignore_ascii_case(bypass)),
                "{bypass} should not be forwarded"
            );
        }

        assert_eq!(
            body["attachments"],
            json!([{
                "content": "JVBERi0xLjQ=",
                "contentType": "application/pdf",
                "filename": "report.pdf",
                "disposition": "attachment",
            }])
        );
    })
    .await
}

#[test_log::test(tokio::test)]
async fn test_send_raw_message_with_encoded_headers() {
    with_flowmailer_testing_server(FlowmailerTestingConfig::default(), |server| async move {
        let config = FlowmailerConfig {
            account_id: "1234".into(),
            client_id: "client-id".into(),
            client_secret: "client-secret".into(),
            api_url: Some(server.url.clone()),
            login_url: Some(server.url.clone()),
            ..Default::default()
        };

        let ctx = FlowmailerContextBuilder::new(config).build().unwrap();

        let raw = MessageBuilder::new()
            .from("alice@localhost")
            .to("bob@localhost")
            .subject("Bienvenue à Zürich")
            .header("X-Metadata-City", Text::new("Zürich"))
            .header("X-Tag", Text::new("résumé"))
            .header("X-Greeting", Text::new("Grüezi"))
            .text_body("Hallo!")
            .write_to_vec()
            .unwrap();

        SendFlowmailerRawMessage::new(&ctx)
            .send_raw_message(&raw)
            .await
            .unwrap();

        let submissions = server.submissions();
        assert_eq!(submissions.len(), 1);

        let body = &submissions[0].body;
        assert_eq!(body["subject"], json!("Bienvenue à Zürich"));
        assert_eq!(body["data"], json!({ "City": "Zürich" }));
        assert_eq!(body["tags"], json!(["résumé"]));

        let greeting = body["headers"]
            .as_array()
            .unwrap()
            .iter()
            .find(|header| header["name"] == json!("X-Greeting"))
            .unwrap();
        assert_eq!(greeting["value"], json!("Grüezi"));
    })
    .await
}

#[test_log::test(tokio::test)]
async fn test_send_raw_message_without_recipient() {
    with_flowmailer_testing_server(FlowmailerTestingConfig::default(), |server| async move {
        let config = FlowmailerConfig {
            account_id: "1234".into(),
            client_id: "client-id".into(),
            client_secret: "client-secret".into(),
            api_url: Some(server.url.clone()),
            login_url: Some(server.url.clone()),
            ..Default::default()
        };

        let ctx = FlowmailerContextBuilder::new(config).build().unwrap();

        let raw = MessageBuilder::new()
            .from("alice@localhost")
            .subject("Nobody")
            .text_body("Nobody will read this.")
            .write_to_vec()
            .unwrap();

        let err = SendFlowmailerRawMessage::new_boxed(&ctx)
            .send_raw_message(&raw)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            flowmailer::Error::Email(flowmailer::email::Error::MissingRecipientError)
        ));
        assert!(server.token_requests().is_empty());
        assert!(server.submissions().is_empty());
    })
    .await
}
