use flowmailer::{
    client::{self, ApiErrorDetail},
    config::FlowmailerConfig,
    email::{Email, Envelope},
    oauth,
    transport::{self, FlowmailerContext, FlowmailerContextBuilder},
    Error,
};
use flowmailer_testing_server::{
    with_flowmailer_testing_server, FlowmailerTestingConfig, FlowmailerTestingServer,
};

fn build_context(server: &FlowmailerTestingServer, client_secret: &str) -> FlowmailerContext {
    let config = FlowmailerConfig {
        account_id: "1234".into(),
        client_id: "client-id".into(),
        client_secret: client_secret.into(),
        api_url: Some(server.url.clone()),
        login_url: Some(server.url.clone()),
        ..Default::default()
    };

    FlowmailerContextBuilder::new(config).build().unwrap()
}

fn email() -> Email {
    Email::builder()
        .from("alice@localhost")
        .to("bob@localhost")
        .cc("carol@localhost")
        .bcc("dave@localhost")
        .subject("Hello")
        .text("Hello!")
        .build()
}

#[test_log::test(tokio::test)]
async fn test_invalid_client_credentials() {
    with_flowmailer_testing_server(FlowmailerTestingConfig::default(), |server| async move {
        let ctx = build_context(&server, "wrong-secret");
        let email = email();
        let envelope = Envelope::from_email(&email).unwrap();

        let err = ctx.send(&email, &envelope).await.unwrap_err();

        assert!(matches!(
            err,
            Error::OAuth(oauth::Error::RequestAccessTokenRejectedError(ref res))
                if res.to_string().contains("invalid_client")
        ));
        assert_eq!(server.token_requests().len(), 1);
        assert!(server.submissions().is_empty());
    })
    .await
}

#[test_log::test(tokio::test)]
async fn test_non_bearer_token_type() {
    let config = FlowmailerTestingConfig {
        token_type: "mac".into(),
        ..Default::default()
    };

    with_flowmailer_testing_server(config, |server| async move {
        let ctx = build_context(&server, "client-secret");
        let email = email();
        let envelope = Envelope::from_email(&email).unwrap();

        let err = ctx.send(&email, &envelope).await.unwrap_err();

        assert!(matches!(
            err,
            Error::OAuth(oauth::Error::InvalidTokenTypeError(ref kind)) if kind == "mac"
        ));
        assert!(server.submissions().is_empty());
    })
    .await
}

#[test_log::test(tokio::test)]
async fn test_non_positive_token_expiration() {
    let config = FlowmailerTestingConfig {
        expires_in: 0,
        ..Default::default()
    };

    with_flowmailer_testing_server(config, |server| async move {
        let ctx = build_context(&server, "client-secret");
        let email = email();
        let envelope = Envelope::from_email(&email).unwrap();

        let err = ctx.send(&email, &envelope).await.unwrap_err();

        assert!(matches!(
            err,
            Error::OAuth(oauth::Error::InvalidExpirationError(0))
        ));
    })
    .await
}

#[test_log::test(tokio::test)]
async fn test_rejected_recipient_among_many() {
    let config = FlowmailerTestingConfig {
        rejected_recipients: vec!["carol@localhost".into()],
        ..Default::default()
    };

    with_flowmailer_testing_server(config, |server| async move {
        let ctx = build_context(&server, "client-secret");
        let email = email();
        let envelope = Envelope::from_email(&email).unwrap();

        let err = ctx.send(&email, &envelope).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot send one or multiple emails: 1 failure(s) for carol@localhost"
        );

        let Error::Transport(err @ transport::Error::SendEmailsError(_)) = &err else {
            panic!("unexpected error: {err:?}");
        };

        let failures = err.failures();
        assert_eq!(failures.len(), 1);

        let client::Error::SubmitMessageError(400, recipient, ApiErrorDetail::Errors(errors)) =
            failures[0]
        else {
            panic!("unexpected failure: {:?}", failures[0]);
        };

        assert_eq!(recipient, "carol@localhost");
        assert_eq!(errors.all_errors[0].field.as_deref(), Some("recipientAddress"));

        // every recipient is attempted
        let submissions = server.submissions();
        assert_eq!(submissions.len(), 3);
        assert_eq!(submissions[2].field("recipientAddress"), Some("dave@localhost"));
    })
    .await
}

#[test_log::test(tokio::test)]
async fn test_rejected_single_recipient() {
    let config = FlowmailerTestingConfig {
        rejected_recipients: vec!["bob@localhost".into()],
        ..Default::default()
    };

    with_flowmailer_testing_server(config, |server| async move {
        let ctx = build_context(&server, "client-secret");
        let email = Email::builder()
            .from("alice@localhost")
            .to("bob@localhost")
            .text("Hello!")
            .build();
        let envelope = Envelope::from_email(&email).unwrap();

        let err = ctx.send(&email, &envelope).await.unwrap_err();

        assert_eq!(err.to_string(), "cannot send email");
        assert!(matches!(
            err,
            Error::Transport(transport::Error::SendEmailError(
                client::Error::SubmitMessageError(400, _, _)
            ))
        ));
    })
    .await
}

#[test_log::test(tokio::test)]
async fn test_missing_location() {
    let config = FlowmailerTestingConfig {
        omit_location: true,
        ..Default::default()
    };

    with_flowmailer_testing_server(config, |server| async move {
        let ctx = build_context(&server, "client-secret");
        let email = Email::builder()
            .from("alice@localhost")
            .to("bob@localhost")
            .text("Hello!")
            .build();
        let envelope = Envelope::from_email(&email).unwrap();

        let err = ctx.send(&email, &envelope).await.unwrap_err();

        assert!(matches!(
            err,
            Error::Transport(transport::Error::SendEmailError(
                client::Error::MissingMessageIdError(ref recipient)
            )) if recipient == "bob@localhost"
        ));
        assert_eq!(server.submissions().len(), 1);
    })
    .await
}
