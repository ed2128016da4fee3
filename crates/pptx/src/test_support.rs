//! In-memory `.pptx` fixtures for tests.

use deck_core::text::escape_xml_content;
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const NS_DECLS: &str = concat!(
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#
);

/// Wrap shape markup in a complete slide part.
pub fn slide_with_shapes(shapes: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\r\n",
            r#"<p:sld {}><p:cSld><p:spTree>"#,
            r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#,
            "{}",
            r#"</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
        ),
        NS_DECLS, shapes
    )
}

/// Build a slide with one shape per entry, one single-run paragraph per text.
pub fn slide_xml(shapes: &[(&str, &[&str])]) -> String {
    let mut markup = String::new();
    for (i, (name, paragraphs)) in shapes.iter().enumerate() {
        markup.push_str(&format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>"#,
            i + 2,
            name
        ));
        for text in paragraphs.iter() {
            markup.push_str(&format!(
                r#"<a:p><a:r><a:rPr lang="en-US" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
                escape_xml_content(text)
            ));
        }
        markup.push_str("</p:txBody></p:sp>");
    }
    slide_with_shapes(&markup)
}

/// Builds a minimal but structurally complete presentation package.
pub struct PackageBuilder {
    /// Slide part stems (`slide3`) and their XML.
    slides: Vec<(String, String)>,
    presentation: String,
    root_rels: Option<String>,
    omitted: Vec<&'static str>,
}

impl PackageBuilder {
    pub const MEDIA_BYTES: &'static [u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 1, 2, 3];

    pub fn new() -> Self {
        Self {
            slides: Vec::new(),
            presentation: "ppt/presentation.xml".to_string(),
            root_rels: None,
            omitted: Vec::new(),
        }
    }

    /// Append a slide numbered after the previous one.
    pub fn slide(mut self, xml: String) -> Self {
        let number = self.slides.len() + 1;
        self.slides.push((format!("slide{}", number), xml));
        self
    }

    /// Add a slide part with an explicit number.
    pub fn named_slide(mut self, number: usize, xml: String) -> Self {
        self.slides.push((format!("slide{}", number), xml));
        self
    }

    /// Add a slide part under `ppt/slides/<stem>.xml`.
    pub fn slide_part(mut self, stem: &str, xml: String) -> Self {
        self.slides.push((stem.to_string(), xml));
        self
    }

    /// Store the main presentation part under another name.
    pub fn presentation_at(mut self, part: &str) -> Self {
        self.presentation = part.to_string();
        self
    }

    /// Replace the package relationships part.
    pub fn root_rels(mut self, xml: &str) -> Self {
        self.root_rels = Some(xml.to_string());
        self
    }

    /// Leave a standard part out of the archive.
    pub fn without(mut self, part: &'static str) -> Self {
        self.omitted.push(part);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut parts: Vec<(String, Vec<u8>)> = vec![
            ("[Content_Types].xml".into(), self.content_types().into_bytes()),
            ("_rels/.rels".into(), self.package_rels().into_bytes()),
            (
                self.presentation.clone(),
                format!(r#"<?xml version="1.0" encoding="UTF-8"?><p:presentation {}><p:sldIdLst/></p:presentation>"#, NS_DECLS).into_bytes(),
            ),
            ("ppt/_rels/presentation.xml.rels".into(), self.presentation_rels().into_bytes()),
            ("ppt/theme/theme1.xml".into(), theme_xml().into_bytes()),
            ("ppt/media/image1.png".into(), Self::MEDIA_BYTES.to_vec()),
        ];
        for (stem, xml) in &self.slides {
            parts.push((format!("ppt/slides/{}.xml", stem), xml.clone().into_bytes()));
            parts.push((
                format!("ppt/slides/_rels/{}.xml.rels", stem),
                br#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"/>"#.to_vec(),
            ));
        }

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, content) in parts {
            if self.omitted.iter().any(|p| *p == name) {
                continue;
            }
            writer.start_file(name, options).unwrap();
            writer.write_all(&content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn package_rels(&self) -> String {
        match &self.root_rels {
            Some(xml) => xml.clone(),
            None => format!(
                r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="{}"/></Relationships>"#,
                self.presentation
            ),
        }
    }

    fn content_types(&self) -> String {
        let mut xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/{}" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>"#,
            self.presentation
        );
        for (stem, _) in &self.slides {
            xml.push_str(&format!(
                r#"<Override PartName="/ppt/slides/{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
                stem
            ));
        }
        xml.push_str("</Types>");
        xml
    }

    fn presentation_rels(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (i, (stem, _)) in self.slides.iter().enumerate() {
            xml.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/{}.xml"/>"#,
                i + 2,
                stem
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }
}

fn theme_xml() -> String {
    let mut xml = format!(r#"<?xml version="1.0" encoding="UTF-8"?><a:theme {} name="Office Theme"><a:themeElements>"#, NS_DECLS);
    for i in 0..20 {
        xml.push_str(&format!(r#"<a:custClr name="Color {}"><a:srgbClr val="{:06X}"/></a:custClr>"#, i, i * 4099));
    }
    xml.push_str("</a:themeElements></a:theme>");
    xml
}

/// Decompress every member of an archive, in archive order.
pub fn read_all_parts(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut content = Vec::new();
            file.read_to_end(&mut content).unwrap();
            (file.name().to_string(), content)
        })
        .collect()
}
