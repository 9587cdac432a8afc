use serde_json::json;
use tracing::{debug, info};

use crate::error::FetchError;
use crate::traits::PortalTransport;

use super::dates::DateWindow;
use super::protocol::{
    CsvKind, DocumentKind, AJAX_COMMAND_ENDPOINT, CSV_RANGE_DEFAULTS, END_DATE_FIELD,
    EXPORT_WIDGET_NAME, START_DATE_FIELD, TRIGGER_ACTION_COMMAND, TRIGGER_EVENT_TYPE,
};
use super::session::PortalSession;

impl<T: PortalTransport> PortalSession<T> {
    /// CSVエクスポートを取得する
    ///
    /// 画面の日付範囲を設定してからエクスポート項目のクリックを送る。
    /// レスポンスにCSVのダウンロードスクリプトが無ければ `Ok(None)`。
    pub async fn download_csv(
        &mut self,
        kind: CsvKind,
        range: DateWindow,
    ) -> Result<Option<Vec<u8>>, FetchError> {
        info!("Exporting {} CSV for {}", kind, range);

        let mut form = vec![
            (START_DATE_FIELD.to_string(), range.portal_start()),
            (END_DATE_FIELD.to_string(), range.portal_end()),
        ];
        form.extend(
            CSV_RANGE_DEFAULTS
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string())),
        );
        self.post(kind.endpoint(), form).await?;

        let response = self
            .post(AJAX_COMMAND_ENDPOINT, trigger_export_form(kind))
            .await?;

        let Some(path) = response.download_path(DocumentKind::Csv) else {
            debug!(
                "No CSV download script in response (commands: {:?})",
                response.command_kinds()
            );
            return Ok(None);
        };

        let url = self.resolve(&path)?;
        debug!("CSV export at {}", url);
        Ok(Some(self.fetch(&url).await?))
    }
}

/// テーブル操作コンボボックスの「エクスポート」クリック
fn trigger_export_form(kind: CsvKind) -> Vec<(String, String)> {
    let event_data = json!({ "button": 0, "value": "" }).to_string();
    vec![
        ("command".to_string(), TRIGGER_ACTION_COMMAND.to_string()),
        ("delay".to_string(), "0".to_string()),
        ("eventData".to_string(), event_data),
        ("eventType".to_string(), TRIGGER_EVENT_TYPE.to_string()),
        ("formName".to_string(), kind.form_name().to_string()),
        ("widgetId".to_string(), kind.export_widget_id()),
        ("widgetName".to_string(), EXPORT_WIDGET_NAME.to_string()),
    ]
}
