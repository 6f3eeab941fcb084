//! # Página Principal
//! src/ui.rs
//!
//! HTML mínimo servido en `GET /`: lista de direcciones, modo, formato y
//! workers; envía el lote y consulta el estado cada segundo. También
//! permite listar un canal y agregar sus videos a la lista.
//!
//! El campo de workers se rellena con los límites configurados.

use crate::jobs::WorkerLimits;

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Batch Downloader</title>
<style>
  body { font-family: sans-serif; max-width: 760px; margin: 2rem auto; }
  textarea, input, select { width: 100%; margin: .25rem 0 .75rem; }
  .row { display: flex; gap: 1rem; }
  .row > div { flex: 1; }
  li.done { color: #2a7; } li.error { color: #c33; } li.running { color: #27c; }
</style>
</head>
<body>
<h1>Batch Downloader</h1>

<label>Channel</label>
<div class="row">
  <div><input id="channel" placeholder="@handle or channel URL"></div>
  <div><button id="browse">List 10 more</button></div>
</div>
<ul id="entries"></ul>

<label>URLs (one per line)</label>
<textarea id="urls" rows="8"></textarea>
<div class="row">
  <div><label>Mode</label>
    <select id="mode"><option value="video">video</option><option value="audio">audio</option></select></div>
  <div><label>Format</label>
    <select id="format">
      <option>best</option><option>1080p</option><option>720p</option>
      <option>mp3</option><option>m4a</option><option>opus</option>
    </select></div>
  <div><label>Workers</label><input id="workers" type="number" min="1" max="{{MAX_WORKERS}}" value="{{DEFAULT_WORKERS}}"></div>
</div>
<button id="start">Download all</button>
<p id="summary"></p>
<ul id="items"></ul>

<script>
const $ = (id) => document.getElementById(id);
let channelStart = 0;

$("channel").oninput = () => {
  channelStart = 0;
  $("entries").innerHTML = "";
};

$("browse").onclick = async () => {
  const url = encodeURIComponent($("channel").value);
  const res = await fetch(`/api/channel?url=${url}&start=${channelStart}&count=10`);
  const data = await res.json();
  if (data.error) { alert(data.error); return; }
  channelStart += data.entries.length;
  for (const e of data.entries) {
    const li = document.createElement("li");
    li.textContent = e.title + " ";
    const add = document.createElement("button");
    add.textContent = "+";
    add.onclick = () => { $("urls").value += ($("urls").value ? "\n" : "") + e.url; };
    li.appendChild(add);
    $("entries").appendChild(li);
  }
};

$("start").onclick = async () => {
  const body = {
    urls: $("urls").value.split("\n"),
    mode: $("mode").value,
    format: $("format").value,
    workers: parseInt($("workers").value, 10),
  };
  const res = await fetch("/api/download", { method: "POST", body: JSON.stringify(body) });
  const data = await res.json();
  if (data.error) { alert(data.error); return; }
  poll(data.job_id);
};

async function poll(jobId) {
  const res = await fetch(`/api/jobs/${jobId}`);
  const job = await res.json();
  if (job.error) { $("summary").textContent = job.error; return; }
  const done = job.items.filter((i) => i.status === "done" || i.status === "error").length;
  $("summary").textContent = `${job.status}: ${done}/${job.items.length} (workers: ${job.workers})`;
  $("items").innerHTML = "";
  for (const item of job.items) {
    const li = document.createElement("li");
    li.className = item.status;
    li.textContent = `[${item.status}] ${item.url} ${item.message}`;
    $("items").appendChild(li);
  }
  if (job.status !== "done" && job.status !== "error") setTimeout(() => poll(jobId), 1000);
}
</script>
</body>
</html>
"#;

/// Página principal con los límites de workers del servidor
pub fn render_index(limits: WorkerLimits) -> String {
    INDEX_HTML
        .replace("{{DEFAULT_WORKERS}}", &limits.default_workers.to_string())
        .replace("{{MAX_WORKERS}}", &limits.max_workers.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_page() {
        let page = render_index(WorkerLimits::default());
        assert!(page.contains("/api/download"));
        assert!(page.contains("/api/jobs/"));
        assert!(page.contains("/api/channel"));
        assert!(!page.contains("{{"));
    }

    #[test]
    fn test_index_uses_configured_limits() {
        let page = render_index(WorkerLimits::new(6, 16));
        assert!(page.contains(r#"max="16" value="6""#));
    }

    #[test]
    fn test_channel_change_resets_paging() {
        let page = render_index(WorkerLimits::default());
        assert!(page.contains(r#"$("channel").oninput"#));
    }
}
