//! In-memory EPUB fixtures.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use quire::model::{ContentNode, Path};
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// Builds a zip container file by file.
pub struct EpubBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

impl EpubBuilder {
    /// An archive with `mimetype` and a container pointing at `OEBPS/content.opf`.
    pub fn new() -> Self {
        Self::empty()
            .file("mimetype", "application/epub+zip")
            .file(
                "META-INF/container.xml",
                r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
            )
    }

    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a file, replacing any earlier one at the same path.
    pub fn file(mut self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.entries.retain(|(existing, _)| existing != path);
        self.entries.push((path.to_string(), content.into()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (path, content) in self.entries {
            writer.start_file(path, options).unwrap();
            writer.write_all(&content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }
}

pub const OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
    <dc:title>Sample &amp; Book</dc:title>
    <dc:creator opf:role="aut">Ann Author</dc:creator>
    <dc:language>en</dc:language>
    <dc:subject>Fiction -- Short stories</dc:subject>
    <dc:date opf:event="publication">1901</dc:date>
    <dc:publisher>Example Press</dc:publisher>
    <meta name="cover" content="cover-image"/>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="ch1" href="text/ch1.xhtml" media-type="application/xhtml+xml"/>
    <item id="ch2" href="text/ch2.xhtml" media-type="application/xhtml+xml"/>
    <item id="css" href="css/style.css" media-type="text/css"/>
    <item id="cover-image" href="images/cover.png" media-type="image/png"/>
    <item id="pic" href="images/pic.png" media-type="image/png"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="ch1"/>
    <itemref idref="ch2"/>
  </spine>
</package>"#;

pub const NCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <docTitle><text>Contents</text></docTitle>
  <navMap>
    <navPoint id="n1" playOrder="1">
      <navLabel><text>Chapter One</text></navLabel>
      <content src="text/ch1.xhtml"/>
      <navPoint id="n2" playOrder="2">
        <navLabel><text>Section</text></navLabel>
        <content src="text/ch2.xhtml#sec"/>
      </navPoint>
      <navPoint id="n3" playOrder="3">
        <navLabel><text>Missing</text></navLabel>
        <content src="text/ch2.xhtml#nowhere"/>
      </navPoint>
    </navPoint>
  </navMap>
</ncx>"#;

pub const CH1: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
  <title>One</title>
  <link rel="stylesheet" type="text/css" href="../css/style.css"/>
</head>
<body><h1 id="start">Chapter One</h1><p id="x">Hello</p><p><a href="ch2.xhtml#sec">Go</a> <img src="../images/pic.png" alt="pic"/></p></body>
</html>"#;

pub const CH2: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><style type="text/css">.note { font-style: italic }</style></head>
<body><div><p class="note">Note</p></div><h2 id="sec">Section</h2><p>End</p></body>
</html>"#;

pub const CSS: &str = "h1 { text-align: center }\n#x { color: red }\np { color: blue; margin: 0 }\n";

/// A two-chapter EPUB 2 book with a stylesheet, an NCX and two images.
pub fn sample_builder() -> EpubBuilder {
    EpubBuilder::new()
        .file("OEBPS/content.opf", OPF)
        .file("OEBPS/toc.ncx", NCX)
        .file("OEBPS/text/ch1.xhtml", CH1)
        .file("OEBPS/text/ch2.xhtml", CH2)
        .file("OEBPS/css/style.css", CSS)
        .file("OEBPS/images/cover.png", vec![1u8, 2, 3])
        .file("OEBPS/images/pic.png", vec![4u8, 5, 6])
}

pub fn sample_epub() -> Vec<u8> {
    sample_builder().build()
}

/// Node addressed by `path`.
pub fn node_at<'a>(forest: &'a [ContentNode], path: &Path) -> &'a ContentNode {
    let (first, rest) = path.split_first().expect("non-empty path");
    let mut node = &forest[*first];
    for &index in rest {
        node = &node.children()[index];
    }
    node
}
