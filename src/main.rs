// ==========================================
// 物料申请系统 - 命令行入口
// ==========================================
// 用法:
//   material-requests import <arquivo.xlsx|csv>
//   material-requests validate <arquivo>
//   material-requests analyze [batch_id]
//   material-requests apply [batch_id] --confirm
//   material-requests status <id> <status>
//   material-requests purge
//   material-requests config [chave valor]
//   material-requests template <saida.csv>
//
// 数据库: MATERIAL_REQUESTS_DB_PATH 或用户数据目录
// 日志: RUST_LOG 控制级别，MATERIAL_REQUESTS_LOG_FORMAT=json 输出 JSON
// ==========================================

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::Utc;
use material_requests::engine::ScanScope;
use material_requests::importer::{write_template_file, RequestImporter};
use material_requests::{
    get_default_db_path, logging, AppState, RequestStatus, APP_NAME, VERSION,
};
use serde::Serialize;

const USAGE: &str = "uso: material-requests <import|validate|analyze|apply|status|purge|config|template> [args]
  import <arquivo>            importa planilha (.xlsx, .xls, .csv)
  validate <arquivo>          valida sem gravar
  analyze [batch_id]          lista quantidades suspeitas
  apply [batch_id] --confirm  aplica as correções sugeridas
  status <id> <status>        altera o status (Pendente, Em Separação, Concluído, Cancelado, Recusado)
  purge                       remove (soft delete) solicitações antigas
  config [chave valor]        mostra ou altera a configuração
  template <saida.csv>        gera modelo de importação";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match std::env::var("MATERIAL_REQUESTS_LOG_FORMAT").as_deref() {
        Ok("json") => logging::init_json(),
        _ => logging::init(),
    }

    let mut args = std::env::args().skip(1);
    let Some(command) = args.next() else {
        eprintln!("{} {}\n{}", APP_NAME, VERSION, USAGE);
        std::process::exit(2);
    };
    let rest: Vec<String> = args.collect();

    if command == "template" {
        let out = rest.first().context("informe o arquivo de saída")?;
        write_template_file(Path::new(out))?;
        println!("{}", out);
        return Ok(());
    }

    let state = AppState::new(get_default_db_path())?;

    match command.as_str() {
        "import" => {
            let file = file_arg(&rest)?;
            let report = state.importer.import_file(&file).await?;
            print_json(&report)?;
        }
        "validate" => {
            let file = file_arg(&rest)?;
            let report = state.importer.validate_file(&file).await?;
            print_json(&report)?;
        }
        "analyze" => {
            let report = state.correction_service.analyze(scope_arg(&rest)).await?;
            print_json(&report)?;
        }
        "apply" => {
            let confirm = rest.iter().any(|a| a == "--confirm");
            let report = state
                .correction_service
                .apply(scope_arg(&rest), confirm)
                .await?;
            print_json(&report)?;
        }
        "status" => {
            let id: i64 = rest
                .first()
                .context("informe o id da solicitação")?
                .parse()
                .context("id inválido")?;
            let status = rest
                .get(1)
                .context("informe o novo status")?
                .parse::<RequestStatus>()
                .map_err(anyhow::Error::msg)?;
            let change = state
                .status_service
                .change_status(id, status, Utc::now())
                .await?;
            print_json(&change)?;
        }
        "config" => {
            let manager = state.config_manager()?;
            if let [key, value] = rest.as_slice() {
                manager.set_global_config_value(key, value)?;
            } else if !rest.is_empty() {
                bail!("uso: config [chave valor]");
            }
            print_json(&manager.get_config_snapshot()?)?;
        }
        "purge" => {
            let report = state.retention_service.purge(Utc::now()).await?;
            print_json(&report)?;
        }
        other => bail!("comando desconhecido: {}\n{}", other, USAGE),
    }

    Ok(())
}

fn file_arg(rest: &[String]) -> anyhow::Result<PathBuf> {
    rest.first()
        .map(PathBuf::from)
        .context("informe o arquivo a importar")
}

fn scope_arg(rest: &[String]) -> ScanScope {
    rest.iter()
        .find(|a| !a.starts_with("--"))
        .map(|batch_id| ScanScope::Batch(batch_id.clone()))
        .unwrap_or(ScanScope::AllBatches)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
