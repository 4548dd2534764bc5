//! Static file serving

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// Static file handler
pub struct StaticFiles {}

impl StaticFiles {
    pub fn new() -> Self {
        Self {}
    }

    /// Serve an embedded file
    pub fn serve(&self, path: &str) -> Response {
        let content_type = guess_content_type(path);

        match path {
            "index.html" => serve_embedded(INDEX_HTML, content_type),
            "app.js" => serve_embedded(APP_JS, content_type),
            "style.css" => serve_embedded(STYLE_CSS, content_type),
            _ => (StatusCode::NOT_FOUND, "File not found").into_response(),
        }
    }
}

impl Default for StaticFiles {
    fn default() -> Self {
        Self::new()
    }
}

fn guess_content_type(path: &str) -> &'static str {
    if path.ends_with(".js") {
        "application/javascript"
    } else if path.ends_with(".css") {
        "text/css"
    } else if path.ends_with(".html") {
        "text/html; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}

fn serve_embedded(content: &'static str, content_type: &'static str) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        content,
    )
        .into_response()
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Dockhand</title>
  <link rel="stylesheet" href="/static/style.css">
</head>
<body>
  <header>
    <h1>Dockhand</h1>
    <span id="runtime-status">checking runtime...</span>
  </header>
  <main>
    <section id="picker">
      <label for="container">Container</label>
      <select id="container"></select>
      <label><input type="checkbox" id="show-all"> show stopped</label>
    </section>
    <section id="navigator" hidden>
      <nav>
        <button data-action="root">/</button>
        <button data-action="up">Up</button>
        <button data-action="tmp">/tmp</button>
        <button data-action="home">/home</button>
        <input id="goto" placeholder="/path/to/dir">
        <button id="goto-btn">Go</button>
      </nav>
      <div id="current-path"></div>
      <div id="message"></div>
      <div id="confirm" hidden>
        <span id="confirm-text"></span>
        <button id="confirm-yes">Delete</button>
        <button id="confirm-no">Cancel</button>
      </div>
      <table>
        <thead>
          <tr><th>Name</th><th>Permissions</th><th>Size</th><th>Modified</th><th></th></tr>
        </thead>
        <tbody id="entries"></tbody>
      </table>
      <form id="upload-form">
        <input type="file" id="upload-file">
        <button type="submit">Upload here</button>
        <button type="button" id="archive-btn">Download folder</button>
      </form>
    </section>
  </main>
  <script src="/static/app.js"></script>
</body>
</html>
"#;

const STYLE_CSS: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; background: #f6f7f9; color: #1d2330; }
header { display: flex; gap: 1rem; align-items: baseline; padding: 0.75rem 1.5rem; background: #1d2330; color: #fff; }
header h1 { font-size: 1.2rem; margin: 0; }
main { padding: 1rem 1.5rem; }
nav { display: flex; gap: 0.4rem; margin-bottom: 0.5rem; }
#goto { flex: 1; }
#current-path { font-family: monospace; margin: 0.5rem 0; }
#message.error { color: #b3261e; }
#confirm { background: #fff4e5; padding: 0.5rem; margin: 0.5rem 0; }
table { width: 100%; border-collapse: collapse; background: #fff; }
th, td { text-align: left; padding: 0.3rem 0.5rem; border-bottom: 1px solid #e3e6eb; font-family: monospace; }
td.dir { cursor: pointer; color: #1a5fb4; }
"#;

const APP_JS: &str = r#"
const $ = (id) => document.getElementById(id);
let sessionId = null;

async function api(method, url, body, raw) {
  const opts = { method, headers: {} };
  if (body !== undefined) {
    if (raw) { opts.body = body; }
    else { opts.body = JSON.stringify(body); opts.headers['Content-Type'] = 'application/json'; }
  }
  const resp = await fetch(url, opts);
  if (!resp.ok) {
    let msg = resp.statusText;
    try { msg = (await resp.json()).error; } catch (_) {}
    throw new Error(msg);
  }
  return resp;
}

function showMessage(text, isError) {
  const el = $('message');
  el.textContent = text || '';
  el.className = isError ? 'error' : '';
}

function render(path, listing) {
  $('current-path').textContent = path;
  const rows = [];
  for (const e of listing.directories.concat(listing.files)) {
    const tr = document.createElement('tr');
    const name = document.createElement('td');
    name.textContent = e.is_directory ? e.name + '/' : e.name;
    if (e.link_target) name.textContent += ' -> ' + e.link_target;
    if (e.is_directory) {
      name.className = 'dir';
      name.onclick = () => navigate({ action: 'enter', name: e.name });
    }
    tr.appendChild(name);
    for (const v of [e.permission_string, e.size_bytes_display, e.modified_display]) {
      const td = document.createElement('td');
      td.textContent = v;
      tr.appendChild(td);
    }
    const actions = document.createElement('td');
    if (!e.is_directory) {
      const dl = document.createElement('a');
      dl.textContent = 'download';
      dl.href = `/api/sessions/${sessionId}/download?name=${encodeURIComponent(e.name)}`;
      actions.appendChild(dl);
      actions.appendChild(document.createTextNode(' '));
    }
    const del = document.createElement('button');
    del.textContent = 'delete';
    del.onclick = () => requestDelete(e);
    actions.appendChild(del);
    tr.appendChild(actions);
    rows.push(tr);
  }
  $('entries').replaceChildren(...rows);
}

async function loadContainers() {
  try {
    const resp = await api('GET', `/api/containers?all=${$('show-all').checked}`);
    const containers = await resp.json();
    const opts = containers.map((c) => {
      const o = document.createElement('option');
      o.value = c.id;
      o.textContent = `${c.name} (${c.short_id}) ${c.status}`;
      return o;
    });
    $('container').replaceChildren(...opts);
    if (containers.length > 0) await openContainer(containers[0].id);
  } catch (err) {
    showMessage(err.message, true);
  }
}

async function openContainer(id) {
  const resp = sessionId
    ? await api('PUT', `/api/sessions/${sessionId}/container`, { container: id })
    : await api('POST', '/api/sessions', { container: id });
  const data = await resp.json();
  sessionId = data.session.id;
  $('navigator').hidden = false;
  $('confirm').hidden = true;
  if (data.listing) { render(data.session.current_path, data.listing); showMessage(''); }
  else { showMessage(data.listing_error, true); }
}

async function navigate(action) {
  try {
    const data = await (await api('POST', `/api/sessions/${sessionId}/navigate`, action)).json();
    render(data.current_path, data.listing);
    showMessage('');
  } catch (err) {
    showMessage(err.message, true);
  }
}

async function requestDelete(entry) {
  try {
    await api('POST', `/api/sessions/${sessionId}/delete`, {
      name: entry.name,
      kind: entry.is_directory ? 'directory' : 'file',
    });
    $('confirm-text').textContent = `Delete ${entry.name}${entry.is_directory ? ' and everything in it' : ''}?`;
    $('confirm').hidden = false;
  } catch (err) {
    showMessage(err.message, true);
  }
}

$('confirm-yes').onclick = async () => {
  $('confirm').hidden = true;
  try {
    const data = await (await api('POST', `/api/sessions/${sessionId}/delete/confirm`)).json();
    render($('current-path').textContent, data.listing);
    showMessage(`Removed ${data.removed}`);
  } catch (err) {
    showMessage(err.message, true);
  }
};

$('confirm-no').onclick = async () => {
  $('confirm').hidden = true;
  await api('POST', `/api/sessions/${sessionId}/delete/cancel`).catch(() => {});
};

$('upload-form').onsubmit = async (ev) => {
  ev.preventDefault();
  const file = $('upload-file').files[0];
  if (!file) return;
  try {
    const url = `/api/sessions/${sessionId}/upload?filename=${encodeURIComponent(file.name)}`;
    const data = await (await api('POST', url, file, true)).json();
    showMessage(`Uploaded ${data.path}`);
    navigate({ action: 'goto', path: $('current-path').textContent });
  } catch (err) {
    showMessage(err.message, true);
  }
};

$('archive-btn').onclick = () => { window.location = `/api/sessions/${sessionId}/archive`; };
$('goto-btn').onclick = () => navigate({ action: 'goto', path: $('goto').value });
for (const btn of document.querySelectorAll('nav button[data-action]')) {
  btn.onclick = () => navigate({ action: btn.dataset.action });
}
$('container').onchange = (ev) => openContainer(ev.target.value).catch((e) => showMessage(e.message, true));
$('show-all').onchange = loadContainers;

api('GET', '/api/runtime')
  .then(() => { $('runtime-status').textContent = 'runtime reachable'; })
  .catch((err) => { $('runtime-status').textContent = err.message; });
loadContainers();
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_types() {
        assert_eq!(guess_content_type("app.js"), "application/javascript");
        assert_eq!(guess_content_type("index.html"), "text/html; charset=utf-8");
        assert_eq!(guess_content_type("blob"), "application/octet-stream");
    }

    #[test]
    fn test_unknown_file_is_not_found() {
        let files = StaticFiles::new();
        assert_eq!(files.serve("nope.js").status(), StatusCode::NOT_FOUND);
        assert_eq!(files.serve("index.html").status(), StatusCode::OK);
    }
}
