//! Unit tests for orders module

#[cfg(test)]
mod tests {
    use super::super::batch::*;
    use super::super::*;
    use crate::client::MockTradingApi;
    use crate::types::{CancelResponse, OpenOrder, OrderBookSummary};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    fn level(price: Decimal, size: Decimal) -> BookLevel {
        BookLevel { price, size }
    }

    fn accepted(order_id: &str) -> PostOrderResponse {
        PostOrderResponse {
            success: true,
            order_id: order_id.to_string(),
            status: "matched".to_string(),
            ..Default::default()
        }
    }

    fn book(asks: Vec<BookLevel>) -> OrderBookSummary {
        OrderBookSummary {
            asset_id: "123".to_string(),
            asks,
            ..Default::default()
        }
    }

    #[test]
    fn test_build_request_per_type() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

        let fok = build_request("123", OrderType::FOK, "25", "", "", "", now, 60).unwrap();
        assert_eq!(
            fok,
            OrderRequest::Market {
                token_id: "123".to_string(),
                amount: dec!(25)
            }
        );

        let gtc = build_request("123", OrderType::GTC, "", "0.45", "100", "", now, 60).unwrap();
        assert_eq!(gtc.order_type(), OrderType::GTC);

        let gtd = build_request("123", OrderType::GTD, "", "0.45", "100", "3600", now, 60).unwrap();
        match gtd {
            OrderRequest::LimitUntil { expiration, .. } => {
                assert_eq!(expiration, now.timestamp() + 3600 + 60)
            }
            other => panic!("expected GTD, got {:?}", other),
        }
    }

    #[test]
    fn test_build_request_rejects_bad_input() {
        let now = Utc::now();
        assert!(build_request("123", OrderType::FOK, "abc", "", "", "", now, 60).is_err());
        assert!(build_request("123", OrderType::GTC, "", "1.5", "10", "", now, 60).is_err());
        assert!(build_request("123", OrderType::GTD, "", "0.5", "10", "-5", now, 60).is_err());
        assert!(build_request(" ", OrderType::FOK, "10", "", "", "", now, 60).is_err());
    }

    #[test]
    fn test_build_request_rejects_expiration_overflow() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let err = build_request(
            "123",
            OrderType::GTD,
            "",
            "0.5",
            "10",
            "9223372036854775807",
            now,
            60,
        )
        .unwrap_err();
        assert!(matches!(err, BotError::InvalidInput(_)));
        let max = u64::MAX.to_string();
        assert!(build_request("123", OrderType::GTD, "", "0.5", "10", &max, now, 60).is_err());
    }

    #[test]
    fn test_plan_sweep_tokens_stops_above_max() {
        let asks = vec![
            level(dec!(0.55), dec!(100)),
            level(dec!(0.50), dec!(30)),
            level(dec!(0.52), dec!(0)),
            level(dec!(0.53), dec!(40)),
        ];

        let fills = plan_sweep(&asks, dec!(0.54), Budget::Tokens(dec!(100)));
        assert_eq!(
            fills,
            vec![
                Fill {
                    price: dec!(0.50),
                    size: dec!(30)
                },
                Fill {
                    price: dec!(0.53),
                    size: dec!(40)
                },
            ]
        );
    }

    #[test]
    fn test_plan_sweep_tokens_budget_exhausted() {
        let asks = vec![level(dec!(0.40), dec!(50)), level(dec!(0.45), dec!(50))];

        let fills = plan_sweep(&asks, dec!(0.99), Budget::Tokens(dec!(70)));
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[1].size, dec!(20));
    }

    #[test]
    fn test_plan_sweep_usd_budget() {
        let asks = vec![level(dec!(0.40), dec!(10)), level(dec!(0.60), dec!(1000))];

        // 10 tokens at 0.40 cost 4 USD, leaving 6 USD -> 10 tokens at 0.60
        let fills = plan_sweep(&asks, dec!(0.70), Budget::Usd(dec!(10)));
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].size, dec!(10));
        assert_eq!(fills[1].size, dec!(10));

        // 5 / 0.30 = 16.666.. truncated to 16.66
        let fills = plan_sweep(&[level(dec!(0.30), dec!(100))], dec!(0.5), Budget::Usd(dec!(5)));
        assert_eq!(fills[0].size, dec!(16.66));
    }

    #[test]
    fn test_budget_unfilled() {
        let asks = vec![level(dec!(0.40), dec!(10))];

        let fills = plan_sweep(&asks, dec!(0.50), Budget::Tokens(dec!(25)));
        assert_eq!(Budget::Tokens(dec!(25)).unfilled(&fills), dec!(15));

        let fills = plan_sweep(&asks, dec!(0.50), Budget::Usd(dec!(10)));
        assert_eq!(Budget::Usd(dec!(10)).unfilled(&fills), dec!(6));
    }

    #[test]
    fn test_plan_sweep_nothing_under_max() {
        let asks = vec![level(dec!(0.80), dec!(10))];
        assert!(plan_sweep(&asks, dec!(0.50), Budget::Tokens(dec!(10))).is_empty());
        assert!(plan_sweep(&[], dec!(0.50), Budget::Usd(dec!(10))).is_empty());
    }

    #[tokio::test]
    async fn test_execute_sweep_continues_after_failure() {
        let mut api = MockTradingApi::new();
        api.expect_get_order_book().returning(|_| {
            Ok(book(vec![
                level(dec!(0.40), dec!(10)),
                level(dec!(0.45), dec!(10)),
                level(dec!(0.50), dec!(10)),
            ]))
        });
        api.expect_post_order().times(3).returning(|request| match request {
            OrderRequest::Limit { price, .. } if *price == dec!(0.45) => {
                Err(BotError::Api("/order 400: not enough balance".into()))
            }
            _ => Ok(accepted("0xabc")),
        });

        let outcomes = execute_sweep(&api, "123", dec!(0.50), Budget::Tokens(dec!(30)))
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].succeeded());
        assert!(!outcomes[1].succeeded());
        assert!(outcomes[2].succeeded());
    }

    #[tokio::test]
    async fn test_execute_sweep_rejects_bad_max_price() {
        let api = MockTradingApi::new();
        let err = execute_sweep(&api, "123", dec!(1.5), Budget::Tokens(dec!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_execute_validates_before_posting() {
        let mut api = MockTradingApi::new();
        api.expect_post_order().never();

        let request = OrderRequest::Market {
            token_id: "123".to_string(),
            amount: dec!(0),
        };
        assert!(execute(&api, &request).await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_all_reports_each_order() {
        let mut api = MockTradingApi::new();
        api.expect_get_open_orders().returning(|| {
            Ok(vec![
                OpenOrder {
                    id: "0x1".to_string(),
                    ..Default::default()
                },
                OpenOrder {
                    id: "0x2".to_string(),
                    ..Default::default()
                },
                OpenOrder {
                    id: "0x3".to_string(),
                    ..Default::default()
                },
            ])
        });
        api.expect_cancel_order().returning(|id| match id {
            "0x1" => Ok(CancelResponse {
                canceled: vec!["0x1".to_string()],
                ..Default::default()
            }),
            "0x2" => Ok(CancelResponse {
                not_canceled: HashMap::from([("0x2".to_string(), "already matched".to_string())]),
                ..Default::default()
            }),
            _ => Err(BotError::Api("/order 500: boom".into())),
        });

        let outcomes = cancel_all(&api).await.unwrap();
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].status, "canceled");
        assert_eq!(outcomes[1].status, "not canceled (already matched)");
        assert!(outcomes[2].status.starts_with("error:"));
    }

    #[test]
    fn test_batch_kind_parse() {
        assert_eq!("fok_max".parse::<BatchKind>().unwrap(), BatchKind::FokMax);
        assert_eq!(
            " gtd ".parse::<BatchKind>().unwrap(),
            BatchKind::Order(OrderType::GTD)
        );
        assert!("IOC".parse::<BatchKind>().is_err());
    }

    #[test]
    fn test_batch_row_fok_max_action() {
        let row = BatchOrderRow {
            token_id: "123".to_string(),
            order_type: "FOK_MAX".to_string(),
            amount: "50".to_string(),
            price: "0.6".to_string(),
            ..Default::default()
        };
        assert_eq!(
            row.action(60).unwrap(),
            BatchAction::Sweep {
                token_id: "123".to_string(),
                max_price: dec!(0.6),
                budget: Budget::Usd(dec!(50)),
            }
        );
    }

    #[test]
    fn test_read_rows_missing_columns_default_empty() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "token_id,order_type,amount").unwrap();
        writeln!(file, "123,FOK,25").unwrap();
        file.flush().unwrap();

        let rows = read_rows(file.path()).unwrap();
        let row = rows[0].as_ref().unwrap();
        assert_eq!(row.amount, "25");
        assert_eq!(row.price, "");
        assert_eq!(row.expire_seconds, "");
    }

    #[tokio::test]
    async fn test_run_batch_in_file_order_skipping_failures() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", BATCH_HEADER.join(",")).unwrap();
        writeln!(file, "111,FOK,25,,,").unwrap();
        writeln!(file, "222,IOC,25,,,").unwrap();
        writeln!(file, "333,GTC,,0.45,100,").unwrap();
        writeln!(file, "444,GTD,,0.45,abc,60").unwrap();
        file.flush().unwrap();

        let posted = Arc::new(Mutex::new(Vec::new()));
        let seen = posted.clone();
        let mut api = MockTradingApi::new();
        api.expect_post_order().times(2).returning(move |request| {
            seen.lock().unwrap().push(request.token_id().to_string());
            Ok(accepted("0xabc"))
        });

        let report = run_batch(&api, file.path(), 60).await.unwrap();
        assert_eq!(report.rows.len(), 4);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 2);
        assert!(matches!(report.rows[1].status, RowStatus::Failed(_)));
        assert_eq!(*posted.lock().unwrap(), vec!["111", "333"]);

        // Read once, never rewritten
        let content = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(content.lines().count(), 5);
    }

    #[tokio::test]
    async fn test_run_batch_missing_file() {
        let api = MockTradingApi::new();
        let dir = tempfile::tempdir().unwrap();
        let err = run_batch(&api, &dir.path().join("nope.csv"), 60)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
